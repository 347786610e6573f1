//! Block reader: turns the lines of one JCAMP-DX block into a
//! [`ParsedBlock`], reading `##DATA TYPE=LINK` compound blocks recursively.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dataset::{decode_single_x_multi_y_line, parse_xy_pairs_line, DataLayout};
use crate::error::{JcampError, Result};
use crate::header::{
    parse_header_line, split_label, strip_comment, HeaderOutcome, HeaderState, HeaderValue, COMMENT_MARKER,
    DATA_SECTION_KEYS, DATA_TYPE_KEY, END_KEY, TITLE_KEY,
};

/// Deepest allowed nesting of compound blocks.
pub const MAX_NESTING_DEPTH: usize = 8;

/// Reader options.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Treat every non-header line as data in this layout, without waiting
    /// for a data-section record. Continuation lines are disabled.
    pub implicit_layout: Option<DataLayout>,
}

impl ReadOptions {
    /// Options for RRUFF files: bare X,Y pairs after the header.
    pub fn rruff() -> Self {
        Self {
            implicit_layout: Some(DataLayout::XyPairs),
        }
    }
}

/// One decoded block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedBlock {
    pub title: Option<String>,
    pub data_type: Option<String>,
    /// Raw value of the record that opened the data table, e.g. `(XY..XY)`.
    pub xy_data_type: Option<String>,
    pub xunits: Option<String>,
    pub yunits: Option<String>,
    pub xfactor: Option<f64>,
    pub yfactor: Option<f64>,
    pub firstx: Option<f64>,
    pub lastx: Option<f64>,
    pub npoints: Option<usize>,
    /// Every other header record, keyed by lowercased label.
    pub headers: BTreeMap<String, HeaderValue>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Nested blocks of a LINK container.
    pub children: Option<Vec<ParsedBlock>>,
}

impl ParsedBlock {
    pub fn header(&self, key: &str) -> Option<&HeaderValue> {
        self.headers.get(key)
    }

    pub fn header_text(&self, key: &str) -> Option<String> {
        self.headers.get(key).map(|v| v.to_string())
    }

    /// Look a header up in this block, then in its children in order.
    pub fn lookup(&self, key: &str) -> Option<&HeaderValue> {
        self.headers.get(key).or_else(|| {
            self.children
                .iter()
                .flatten()
                .find_map(|child| child.lookup(key))
        })
    }

    pub fn is_compound(&self) -> bool {
        self.children.is_some()
    }

    /// Leaf blocks carrying a spectrum: the block itself, or every leaf
    /// below a LINK container.
    pub fn data_blocks(&self) -> Vec<&ParsedBlock> {
        match &self.children {
            Some(children) => children.iter().flat_map(|c| c.data_blocks()).collect(),
            None => vec![self],
        }
    }
}

/// Read a block from a file.
pub fn read_block_file<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<ParsedBlock> {
    let path = path.as_ref();
    log::debug!("Reading JCAMP-DX block from {}", path.display());
    let file = File::open(path)?;
    read_block(BufReader::new(file), options)
}

/// Read a block from a buffered reader.
pub fn read_block<R: BufRead>(reader: R, options: &ReadOptions) -> Result<ParsedBlock> {
    let mut parser = BlockParser::new(options, 0)?;
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData => JcampError::InvalidEncoding { line: index + 1 },
            _ => JcampError::Io(e),
        })?;
        parser.feed(&line)?;
    }
    parser.finish()
}

/// Read a block from in-memory lines.
pub fn read_block_lines<I, S>(lines: I, options: &ReadOptions) -> Result<ParsedBlock>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    read_nested(lines, options, 0)
}

fn read_nested<I, S>(lines: I, options: &ReadOptions, depth: usize) -> Result<ParsedBlock>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = BlockParser::new(options, depth)?;
    for line in lines {
        parser.feed(line.as_ref())?;
    }
    parser.finish()
}

/// Data section currently being read.
#[derive(Debug, Clone, Copy)]
enum Section {
    Pending,
    Reading(DataLayout),
    Skipping,
}

/// Buffer of a nested block still being collected.
struct NestedBuffer {
    lines: Vec<String>,
    depth: usize,
}

struct BlockParser<'a> {
    options: &'a ReadOptions,
    depth: usize,
    header: HeaderState,
    /// Layout of the block's data, fixed by the first data line.
    layout: Option<DataLayout>,
    section: Section,
    /// `(X++(Y..Y))` line anchors and the number of ordinates on each line.
    anchors: Vec<f64>,
    run_lengths: Vec<usize>,
    x: Vec<f64>,
    y: Vec<f64>,
    pending_x: Option<f64>,
    previous_ended_in_difference: bool,
    nested: Option<NestedBuffer>,
    children: Vec<ParsedBlock>,
    ended: bool,
}

impl<'a> BlockParser<'a> {
    fn new(options: &'a ReadOptions, depth: usize) -> Result<Self> {
        if depth > MAX_NESTING_DEPTH {
            return Err(JcampError::NestingTooDeep {
                depth: MAX_NESTING_DEPTH,
            });
        }
        let header = HeaderState {
            allow_continuation: options.implicit_layout.is_none(),
            ..Default::default()
        };
        Ok(Self {
            options,
            depth,
            header,
            layout: None,
            section: Section::Pending,
            anchors: Vec::new(),
            run_lengths: Vec::new(),
            x: Vec::new(),
            y: Vec::new(),
            pending_x: None,
            previous_ended_in_difference: false,
            nested: None,
            children: Vec::new(),
            ended: false,
        })
    }

    fn feed(&mut self, raw: &str) -> Result<()> {
        if self.ended {
            return Ok(());
        }
        let line = raw.trim();

        if let Some(buffer) = self.nested.as_mut() {
            buffer.lines.push(line.to_string());
            match label_key(line).as_deref() {
                Some(TITLE_KEY) => buffer.depth += 1,
                Some(END_KEY) => buffer.depth -= 1,
                _ => {}
            }
            if buffer.depth == 0 {
                self.close_nested()?;
            }
            return Ok(());
        }

        if line.is_empty() || line.starts_with(COMMENT_MARKER) {
            return Ok(());
        }

        if self.header.compound && label_key(line).as_deref() == Some(TITLE_KEY) {
            self.nested = Some(NestedBuffer {
                lines: vec![line.to_string()],
                depth: 1,
            });
            return Ok(());
        }

        match parse_header_line(line, &mut self.header)? {
            HeaderOutcome::Record { key } => {
                if key == END_KEY {
                    self.ended = true;
                } else if DATA_SECTION_KEYS.contains(&key.as_str()) {
                    self.section = Section::Pending;
                    self.previous_ended_in_difference = false;
                }
            }
            HeaderOutcome::Continuation { .. } => {}
            HeaderOutcome::NotHeader => {
                if self.options.implicit_layout.is_some() || self.header.in_data_section {
                    self.push_data_line(line)?;
                } else {
                    log::debug!("Ignoring line outside any record: {}", line);
                }
            }
        }
        Ok(())
    }

    fn close_nested(&mut self) -> Result<()> {
        if let Some(buffer) = self.nested.take() {
            let child = read_nested(&buffer.lines, self.options, self.depth + 1)?;
            log::debug!(
                "Read nested block {:?} at depth {} ({} points)",
                child.title,
                self.depth + 1,
                child.x.len()
            );
            self.children.push(child);
        }
        Ok(())
    }

    fn section_layout(&mut self) -> Result<Option<DataLayout>> {
        let tagged = match self.section {
            Section::Reading(layout) => return Ok(Some(layout)),
            Section::Skipping => return Ok(None),
            Section::Pending => match self.options.implicit_layout {
                Some(layout) => layout,
                None => DataLayout::from_tag(strip_comment(self.header.data_tag.as_deref().unwrap_or("")))?,
            },
        };
        self.section = match self.layout {
            None => {
                self.layout = Some(tagged);
                Section::Reading(tagged)
            }
            Some(current) if current == tagged => Section::Reading(tagged),
            Some(current) => {
                log::warn!(
                    "Skipping {} data section in a block already read as {}",
                    tagged,
                    current
                );
                Section::Skipping
            }
        };
        Ok(match self.section {
            Section::Reading(layout) => Some(layout),
            _ => None,
        })
    }

    fn push_data_line(&mut self, line: &str) -> Result<()> {
        let line = strip_comment(line);
        if line.is_empty() {
            return Ok(());
        }
        match self.section_layout()? {
            Some(DataLayout::XyPairs) => self.push_xy_pairs(line),
            Some(DataLayout::SingleXMultiY) => self.push_single_x_multi_y(line),
            None => Ok(()),
        }
    }

    fn push_xy_pairs(&mut self, line: &str) -> Result<()> {
        let values = parse_xy_pairs_line(line)?;
        let mut values = self.pending_x.take().into_iter().chain(values);
        while let Some(x) = values.next() {
            match values.next() {
                Some(y) => {
                    self.x.push(x);
                    self.y.push(y);
                }
                None => self.pending_x = Some(x),
            }
        }
        Ok(())
    }

    fn push_single_x_multi_y(&mut self, line: &str) -> Result<()> {
        let decoded = decode_single_x_multi_y_line(line)?;
        let mut values = decoded.values.into_iter();
        let Some(anchor) = values.next() else {
            return Ok(());
        };
        let ordinates: Vec<f64> = values.collect();

        // Y-value check: a line following one that ended in DIF form repeats
        // the last ordinate of the previous line.
        if self.previous_ended_in_difference {
            if let (Some(&check), Some(&last)) = (ordinates.first(), self.y.last()) {
                if (check - last).abs() <= 1e-9 * last.abs().max(1.0) {
                    self.y.pop();
                    if let Some(run) = self.run_lengths.last_mut() {
                        *run = run.saturating_sub(1);
                    }
                } else {
                    log::warn!(
                        "Y-value check failed: expected {}, found {} in line: {}",
                        last,
                        check,
                        line
                    );
                }
            }
        }

        self.anchors.push(anchor);
        self.run_lengths.push(ordinates.len());
        self.y.extend(ordinates);
        self.previous_ended_in_difference = decoded.ends_in_difference;
        Ok(())
    }

    /// Interpolate one X per ordinate from the line anchors. The last run
    /// ends at `lastx`, given in scaled units.
    fn reconstruct_x(&self, lastx: Option<f64>, xfactor: f64) -> Result<Vec<f64>> {
        let mut x = Vec::with_capacity(self.y.len());
        let runs = self.anchors.len();
        for (i, (&start, &count)) in self.anchors.iter().zip(&self.run_lengths).enumerate() {
            if count == 0 {
                continue;
            }
            if i + 1 < runs {
                let dx = (self.anchors[i + 1] - start) / count as f64;
                x.extend((0..count).map(|k| start + dx * k as f64));
            } else {
                let last = lastx.ok_or(JcampError::MissingLastX)? / xfactor;
                if count == 1 {
                    x.push(last);
                } else {
                    let dx = (last - start) / (count - 1) as f64;
                    x.extend((0..count).map(|k| start + dx * k as f64));
                }
            }
        }
        Ok(x)
    }

    fn finish(mut self) -> Result<ParsedBlock> {
        if self.nested.is_some() {
            log::warn!("Nested block not terminated by ##END=, reading it as-is");
            self.close_nested()?;
        }
        if let Some(x) = self.pending_x {
            log::warn!("Dropping X value {} with no matching Y", x);
        }

        let mut headers = std::mem::take(&mut self.header.entries);
        let title = take_text(&mut headers, TITLE_KEY);
        let data_type = take_text(&mut headers, DATA_TYPE_KEY);
        let xunits = take_text(&mut headers, "xunits");
        let yunits = take_text(&mut headers, "yunits");
        let xfactor = take_f64(&mut headers, "xfactor");
        let yfactor = take_f64(&mut headers, "yfactor");
        let firstx = take_f64(&mut headers, "firstx");
        let lastx = take_f64(&mut headers, "lastx");
        let npoints = take_f64(&mut headers, "npoints")
            .filter(|n| *n >= 0.0 && n.fract() == 0.0)
            .map(|n| n as usize);
        headers.remove(END_KEY);
        for key in DATA_SECTION_KEYS {
            headers.remove(key);
        }

        let (mut x, mut y) = match self.layout {
            Some(DataLayout::SingleXMultiY) => {
                let x = self.reconstruct_x(lastx, xfactor.unwrap_or(1.0))?;
                (x, std::mem::take(&mut self.y))
            }
            Some(DataLayout::XyPairs) => (std::mem::take(&mut self.x), std::mem::take(&mut self.y)),
            None => (Vec::new(), Vec::new()),
        };
        if let Some(factor) = xfactor {
            x.iter_mut().for_each(|v| *v *= factor);
        }
        if let Some(factor) = yfactor {
            y.iter_mut().for_each(|v| *v *= factor);
        }

        if let Some(n) = npoints {
            if self.layout.is_some() && n != x.len() {
                log::warn!(
                    "Block {:?} declares {} points but {} were read",
                    title,
                    n,
                    x.len()
                );
            }
        }

        Ok(ParsedBlock {
            title,
            data_type,
            xy_data_type: self.header.data_tag.take(),
            xunits,
            yunits,
            xfactor,
            yfactor,
            firstx,
            lastx,
            npoints,
            headers,
            x,
            y,
            children: self.header.compound.then_some(self.children),
        })
    }
}

fn label_key(line: &str) -> Option<String> {
    split_label(line).map(|(key, _)| key)
}

fn take_text(headers: &mut BTreeMap<String, HeaderValue>, key: &str) -> Option<String> {
    headers.remove(key).map(|v| v.to_string())
}

fn take_f64(headers: &mut BTreeMap<String, HeaderValue>, key: &str) -> Option<f64> {
    let value = headers.get(key)?.as_f64();
    match value {
        Some(v) => {
            headers.remove(key);
            Some(v)
        }
        None => {
            log::warn!("Header {} is not numeric: {:?}", key, headers.get(key));
            None
        }
    }
}

//! Console output for batch runs
//!
//! One line per record in final sort order, columns padded to the widest
//! value so results line up.

use crate::record::Record;
use std::io::{self, Write};

pub fn print_records<W: Write>(out: &mut W, records: &[Record]) -> io::Result<()> {
    let metric_w = records.iter().map(|r| r.metric.chars().count()).max().unwrap_or(0);
    let s1_w = records.iter().map(|r| r.s1.chars().count()).max().unwrap_or(0);
    let s2_w = records.iter().map(|r| r.s2.chars().count()).max().unwrap_or(0);

    for record in records {
        writeln!(
            out,
            "{:<metric_w$}  {:<s1_w$}  {:<s2_w$}  {}",
            record.metric,
            record.s1,
            record.s2,
            record.score_fixed(),
            metric_w = metric_w,
            s1_w = s1_w,
            s2_w = s2_w,
        )?;
    }
    out.flush()
}

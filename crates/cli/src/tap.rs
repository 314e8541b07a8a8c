//! TAP version 14 reporting for the conformance runner.

use std::io::{self, Write};

#[derive(Default)]
pub struct Tap {
    points: Vec<TestPoint>,
}

struct TestPoint {
    ok: bool,
    desc: String,
    diagnostics: Option<String>,
}

impl Tap {
    pub fn new() -> Self {
        Tap::default()
    }

    pub fn ok(&mut self, desc: impl Into<String>) {
        self.points.push(TestPoint {
            ok: true,
            desc: desc.into(),
            diagnostics: None,
        });
    }

    pub fn not_ok(&mut self, desc: impl Into<String>, diagnostics: impl Into<String>) {
        self.points.push(TestPoint {
            ok: false,
            desc: desc.into(),
            diagnostics: Some(diagnostics.into()),
        });
    }

    pub fn failure_count(&self) -> usize {
        self.points.iter().filter(|t| !t.ok).count()
    }

    /// Emit the whole stream: version line, plan, one line per test point
    /// (failures followed by `#` diagnostic lines), then a summary.
    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "TAP version 14")?;
        writeln!(out, "1..{}", self.points.len())?;
        for (i, t) in self.points.iter().enumerate() {
            let status = if t.ok { "ok" } else { "not ok" };
            writeln!(out, "{} {} - {}", status, i + 1, t.desc)?;
            if let Some(diag) = &t.diagnostics {
                for line in diag.lines() {
                    writeln!(out, "  # {}", line)?;
                }
            }
        }
        let failed = self.failure_count();
        writeln!(out, "# tests {}", self.points.len())?;
        writeln!(out, "# pass  {}", self.points.len() - failed)?;
        writeln!(out, "# fail  {}", failed)?;
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_layout() {
        let mut tap = Tap::new();
        tap.ok("roundtrip/empty");
        tap.not_ok("negative/lexical", "errors expected 2, got 3\nsecond line");
        assert_eq!(tap.failure_count(), 1);

        let mut out = Vec::new();
        tap.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "TAP version 14\n\
             1..2\n\
             ok 1 - roundtrip/empty\n\
             not ok 2 - negative/lexical\n  \
             # errors expected 2, got 3\n  \
             # second line\n\
             # tests 2\n\
             # pass  1\n\
             # fail  1\n"
        );
    }

    #[test]
    fn empty_plan() {
        let mut out = Vec::new();
        Tap::new().write_to(&mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("TAP version 14\n1..0\n"));
    }
}

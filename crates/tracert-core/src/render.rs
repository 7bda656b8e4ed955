//! Hop sinks that write a trace to an output stream.

use crate::{Hop, HopClass, HopOutcome, HopSink, Trace};
use std::io::Write;

/// Streams the human-readable two-line-per-hop format.
///
/// ```text
/// Tracing route to dns.google [8.8.8.8]:
///
/// 1. 192.168.1.1
/// local
///
/// 2. *
///
/// 3. 8.8.8.8
/// GOOGLE, 15169, US
///
/// ```
pub struct TextRenderer<W: Write> {
    out: W,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> HopSink for TextRenderer<W> {
    fn start(&mut self, trace: &Trace) -> std::io::Result<()> {
        writeln!(
            self.out,
            "Tracing route to {} [{}]:\n",
            trace.destination, trace.ip_address
        )?;
        self.out.flush()
    }

    fn hop(&mut self, hop: &Hop) -> std::io::Result<()> {
        match &hop.outcome {
            HopOutcome::TimedOut => writeln!(self.out, "{}. *\n", hop.ttl)?,
            HopOutcome::Responded {
                ip_address,
                class,
                annotation,
                ..
            } => {
                writeln!(self.out, "{}. {}", hop.ttl, ip_address)?;
                match (class, annotation) {
                    (HopClass::Private, _) => writeln!(self.out, "local\n")?,
                    (HopClass::Public, Some(annotation)) => writeln!(self.out, "{annotation}\n")?,
                    (HopClass::Public, None) => writeln!(self.out)?,
                }
            }
        }
        self.out.flush()
    }

    fn finish(&mut self, _trace: &Trace) -> std::io::Result<()> {
        self.out.flush()
    }
}

/// Collects nothing while tracing and writes the finished trace as JSON.
pub struct JsonRenderer<W: Write> {
    out: W,
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> HopSink for JsonRenderer<W> {
    fn start(&mut self, _trace: &Trace) -> std::io::Result<()> {
        Ok(())
    }

    fn hop(&mut self, _hop: &Hop) -> std::io::Result<()> {
        Ok(())
    }

    fn finish(&mut self, trace: &Trace) -> std::io::Result<()> {
        serde_json::to_writer_pretty(&mut self.out, trace)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    fn render(hops: &[Hop]) -> String {
        let trace = Trace::new("dns.google", Ipv4Addr::new(8, 8, 8, 8), 30);
        let mut renderer = TextRenderer::new(Vec::new());
        renderer.start(&trace).unwrap();
        for hop in hops {
            renderer.hop(hop).unwrap();
        }
        renderer.finish(&trace).unwrap();
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn test_header() {
        assert_eq!(render(&[]), "Tracing route to dns.google [8.8.8.8]:\n\n");
    }

    #[test]
    fn test_hop_lines() {
        let rtt = Duration::from_millis(3);
        let output = render(&[
            Hop::private(1, Ipv4Addr::new(192, 168, 1, 1), rtt),
            Hop::timed_out(2),
            Hop::public(3, Ipv4Addr::new(203, 0, 113, 9), rtt, None),
            Hop::public(
                4,
                Ipv4Addr::new(8, 8, 8, 8),
                rtt,
                Some("GOOGLE, 15169, US".to_string()),
            ),
        ]);

        let body = output
            .strip_prefix("Tracing route to dns.google [8.8.8.8]:\n\n")
            .unwrap();
        assert_eq!(
            body,
            "1. 192.168.1.1\nlocal\n\n\
             2. *\n\n\
             3. 203.0.113.9\n\n\
             4. 8.8.8.8\nGOOGLE, 15169, US\n\n"
        );
    }

    #[test]
    fn test_json_renderer_writes_on_finish() {
        let mut trace = Trace::new("dns.google", Ipv4Addr::new(8, 8, 8, 8), 30);
        trace.push(Hop::timed_out(1)).unwrap();

        let mut out = Vec::new();
        {
            let mut renderer = JsonRenderer::new(&mut out);
            renderer.start(&trace).unwrap();
            renderer.hop(&trace.hops[0]).unwrap();
        }
        assert!(out.is_empty());

        let mut renderer = JsonRenderer::new(&mut out);
        renderer.finish(&trace).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["hops"][0]["ttl"], 1);
        assert_eq!(value["hops"][0]["outcome"], "timed_out");
    }
}

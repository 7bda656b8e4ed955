//! Serial trace execution.
//!
//! Sends one probe at a time and waits for its reply (or the timeout) before
//! sending the next one. Registry lookups run between probes.

use crate::{
    classify, Hop, HopClass, HopEnricher, HopSink, ProbeResponse, Trace, TraceParams,
    TraceStatus, TracerouteDriver, TracerouteError,
};
use std::net::Ipv4Addr;
use tokio::time::timeout;
use tracing::{debug, trace};

/// Drives the per-TTL loop for one destination.
pub struct TraceOrchestrator {
    params: TraceParams,
    enricher: Box<dyn HopEnricher>,
}

impl TraceOrchestrator {
    /// Creates an orchestrator after validating `params`.
    pub fn new(
        params: TraceParams,
        enricher: Box<dyn HopEnricher>,
    ) -> Result<Self, TracerouteError> {
        params.validate()?;
        Ok(Self { params, enricher })
    }

    /// Traces the route to `ip_address`, streaming every hop to `sink`.
    ///
    /// Stops at the first hop that answers from `ip_address`, or after
    /// `max_hops` probes. Running out of hops is a normal completion.
    pub async fn run<D: TracerouteDriver + ?Sized>(
        &self,
        driver: &mut D,
        destination: &str,
        ip_address: Ipv4Addr,
        sink: &mut dyn HopSink,
    ) -> Result<Trace, TracerouteError> {
        let mut result = Trace::new(destination, ip_address, self.params.max_hops);
        sink.start(&result).map_err(TracerouteError::Output)?;

        for ttl in 1..=self.params.max_hops {
            let hop = match self.probe(driver, ttl).await? {
                Some(probe) => self.to_hop(probe).await,
                None => Hop::timed_out(ttl),
            };

            result.push(hop)?;
            if let Some(hop) = result.hops.last() {
                sink.hop(hop).map_err(TracerouteError::Output)?;
            }

            if result.status == TraceStatus::Reached {
                debug!(ttl = ttl, "Reached destination, stopping");
                break;
            }
        }

        sink.finish(&result).map_err(TracerouteError::Output)?;
        Ok(result)
    }

    /// Sends the probe for `ttl` and waits for its reply.
    async fn probe<D: TracerouteDriver + ?Sized>(
        &self,
        driver: &mut D,
        ttl: u8,
    ) -> Result<Option<ProbeResponse>, TracerouteError> {
        debug!(ttl = ttl, "Sending probe");
        driver.send_probe(ttl).await?;

        let probe_result = timeout(self.params.probe_timeout, async {
            loop {
                match driver.receive_probe(self.params.probe_timeout).await {
                    Ok(Some(p)) if p.ttl == ttl => return Ok(p),
                    Ok(Some(p)) => {
                        trace!(ttl = ttl, late_ttl = p.ttl, "Ignoring late reply");
                        continue;
                    }
                    Ok(None) => continue,
                    Err(e) if e.is_retryable() => {
                        trace!(error = %e, "Retryable error, continuing");
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }
        })
        .await;

        match probe_result {
            Ok(Ok(probe)) => {
                debug!(
                    ttl = probe.ttl,
                    ip = %probe.ip,
                    rtt_ms = probe.rtt.as_secs_f64() * 1000.0,
                    is_dest = probe.is_dest,
                    "Received probe response"
                );
                Ok(Some(probe))
            }
            Ok(Err(e)) => {
                debug!(ttl = ttl, error = %e, "Fatal error during receive");
                Err(e)
            }
            Err(_) => {
                debug!(ttl = ttl, "Timeout waiting for response");
                Ok(None)
            }
        }
    }

    /// Classifies a response and, for public hops, attaches the registry summary.
    async fn to_hop(&self, probe: ProbeResponse) -> Hop {
        match classify(probe.ip) {
            HopClass::Private => Hop::private(probe.ttl, probe.ip, probe.rtt),
            HopClass::Public => {
                let annotation =
                    match timeout(self.params.lookup_timeout, self.enricher.enrich(probe.ip)).await
                    {
                        Ok(annotation) => annotation,
                        Err(_) => {
                            debug!(ip = %probe.ip, "Registry lookup timed out");
                            None
                        }
                    };
                Hop::public(probe.ttl, probe.ip, probe.rtt, annotation)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HopOutcome, NoEnrichment};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const DEST: Ipv4Addr = Ipv4Addr::new(8, 8, 8, 8);

    /// Answers each TTL from a fixed script; unscripted TTLs never answer.
    struct ScriptedDriver {
        replies: HashMap<u8, Ipv4Addr>,
        sent: Arc<Mutex<Vec<u8>>>,
        pending: Option<u8>,
        noise_first: bool,
    }

    impl ScriptedDriver {
        fn new(replies: &[(u8, Ipv4Addr)]) -> Self {
            Self {
                replies: replies.iter().copied().collect(),
                sent: Arc::new(Mutex::new(Vec::new())),
                pending: None,
                noise_first: false,
            }
        }
    }

    #[async_trait]
    impl TracerouteDriver for ScriptedDriver {
        async fn send_probe(&mut self, ttl: u8) -> Result<(), TracerouteError> {
            self.sent.lock().unwrap().push(ttl);
            self.pending = Some(ttl);
            Ok(())
        }

        async fn receive_probe(
            &mut self,
            timeout: Duration,
        ) -> Result<Option<ProbeResponse>, TracerouteError> {
            if self.noise_first {
                self.noise_first = false;
                return Err(TracerouteError::PacketMismatch);
            }
            let reply = self
                .pending
                .take()
                .and_then(|ttl| self.replies.get(&ttl).map(|ip| (ttl, *ip)));
            match reply {
                Some((ttl, ip)) => Ok(Some(ProbeResponse {
                    ttl,
                    ip,
                    rtt: Duration::from_millis(5),
                    is_dest: ip == DEST,
                })),
                None => {
                    tokio::time::sleep(timeout).await;
                    Err(TracerouteError::ReadTimeout)
                }
            }
        }

        async fn close(&mut self) -> Result<(), TracerouteError> {
            Ok(())
        }
    }

    struct FakeEnricher {
        calls: Arc<Mutex<Vec<Ipv4Addr>>>,
        delay: Duration,
    }

    #[async_trait]
    impl HopEnricher for FakeEnricher {
        async fn enrich(&self, ip: Ipv4Addr) -> Option<String> {
            self.calls.lock().unwrap().push(ip);
            tokio::time::sleep(self.delay).await;
            Some("GOOGLE, 15169, US".to_string())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        started: bool,
        hops: Vec<Hop>,
        finished: Option<TraceStatus>,
    }

    impl HopSink for RecordingSink {
        fn start(&mut self, _trace: &Trace) -> std::io::Result<()> {
            self.started = true;
            Ok(())
        }

        fn hop(&mut self, hop: &Hop) -> std::io::Result<()> {
            self.hops.push(hop.clone());
            Ok(())
        }

        fn finish(&mut self, trace: &Trace) -> std::io::Result<()> {
            self.finished = Some(trace.status);
            Ok(())
        }
    }

    fn params(max_hops: u8) -> TraceParams {
        TraceParams {
            max_hops,
            probe_timeout: Duration::from_secs(2),
            lookup_timeout: Duration::from_secs(10),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_destination() {
        let mut driver = ScriptedDriver::new(&[
            (1, Ipv4Addr::new(192, 168, 1, 1)),
            (3, Ipv4Addr::new(203, 0, 113, 1)),
            (4, DEST),
            (5, Ipv4Addr::new(1, 1, 1, 1)),
        ]);
        let sent = Arc::clone(&driver.sent);
        let calls = Arc::new(Mutex::new(Vec::new()));
        let enricher = FakeEnricher {
            calls: Arc::clone(&calls),
            delay: Duration::ZERO,
        };
        let orchestrator = TraceOrchestrator::new(params(30), Box::new(enricher)).unwrap();
        let mut sink = RecordingSink::default();

        let trace = orchestrator
            .run(&mut driver, "dns.google", DEST, &mut sink)
            .await
            .unwrap();

        assert_eq!(trace.status, TraceStatus::Reached);
        assert_eq!(*sent.lock().unwrap(), vec![1, 2, 3, 4]);
        let ttls: Vec<u8> = trace.hops.iter().map(|h| h.ttl).collect();
        assert_eq!(ttls, vec![1, 2, 3, 4]);

        assert_eq!(trace.hops[0].class(), Some(HopClass::Private));
        assert_eq!(trace.hops[0].annotation(), None);
        assert_eq!(trace.hops[1].outcome, HopOutcome::TimedOut);
        assert_eq!(trace.hops[3].annotation(), Some("GOOGLE, 15169, US"));

        // Private hops are never looked up.
        assert_eq!(
            *calls.lock().unwrap(),
            vec![Ipv4Addr::new(203, 0, 113, 1), DEST]
        );

        assert!(sink.started);
        assert_eq!(sink.hops, trace.hops);
        assert_eq!(sink.finished, Some(TraceStatus::Reached));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_timeouts_exhaust_budget() {
        let mut driver = ScriptedDriver::new(&[]);
        let orchestrator = TraceOrchestrator::new(params(5), Box::new(NoEnrichment)).unwrap();
        let mut sink = RecordingSink::default();

        let trace = orchestrator
            .run(&mut driver, "unreachable.example", DEST, &mut sink)
            .await
            .unwrap();

        assert_eq!(trace.status, TraceStatus::Exhausted);
        assert_eq!(trace.hops.len(), 5);
        for (idx, hop) in trace.hops.iter().enumerate() {
            assert_eq!(hop.ttl as usize, idx + 1);
            assert_eq!(hop.outcome, HopOutcome::TimedOut);
            assert_eq!(hop.class(), None);
            assert_eq!(hop.annotation(), None);
        }
        assert_eq!(sink.finished, Some(TraceStatus::Exhausted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_lookup_degrades_to_no_annotation() {
        let mut driver = ScriptedDriver::new(&[(1, DEST)]);
        let enricher = FakeEnricher {
            calls: Arc::new(Mutex::new(Vec::new())),
            delay: Duration::from_secs(60),
        };
        let orchestrator = TraceOrchestrator::new(params(30), Box::new(enricher)).unwrap();
        let mut sink = RecordingSink::default();

        let trace = orchestrator
            .run(&mut driver, "dns.google", DEST, &mut sink)
            .await
            .unwrap();

        assert_eq!(trace.hops.len(), 1);
        assert_eq!(trace.hops[0].class(), Some(HopClass::Public));
        assert_eq!(trace.hops[0].annotation(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skips_unrelated_packets() {
        let mut driver = ScriptedDriver::new(&[(1, DEST)]);
        driver.noise_first = true;
        let orchestrator = TraceOrchestrator::new(params(30), Box::new(NoEnrichment)).unwrap();
        let mut sink = RecordingSink::default();

        let trace = orchestrator
            .run(&mut driver, "dns.google", DEST, &mut sink)
            .await
            .unwrap();

        assert_eq!(trace.status, TraceStatus::Reached);
        assert_eq!(trace.hops[0].ip_address(), Some(DEST));
    }

    #[test]
    fn test_rejects_invalid_params() {
        assert!(TraceOrchestrator::new(params(0), Box::new(NoEnrichment)).is_err());
    }
}

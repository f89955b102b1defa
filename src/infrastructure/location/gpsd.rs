//! gpsd location stream adapter
//!
//! Speaks the gpsd JSON protocol over TCP: connect, enable watching, then
//! consume one TPV object per fix. Connection loss is transient; the next
//! poll reconnects.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};

use crate::application::ports::{LocationError, LocationStream};
use crate::domain::geo::Coordinate;

/// Watch command enabling JSON reports
const WATCH_COMMAND: &str = "?WATCH={\"enable\":true,\"json\":true}\n";

/// How long to wait for one report before giving up on the connection
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// One gpsd report; everything except TPV is ignored
#[derive(Debug, Deserialize)]
struct GpsdReport {
    class: String,
    /// Fix mode: 0/1 = none, 2 = 2D, 3 = 3D
    mode: Option<u8>,
    lat: Option<f64>,
    lon: Option<f64>,
    /// Estimated longitude error, meters
    epx: Option<f64>,
    /// Estimated latitude error, meters
    epy: Option<f64>,
}

/// Location stream backed by a gpsd daemon
pub struct GpsdLocationStream {
    addr: String,
    connection: Option<(BufReader<OwnedReadHalf>, OwnedWriteHalf)>,
}

impl GpsdLocationStream {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            connection: None,
        }
    }

    async fn connect(&mut self) -> Result<(), LocationError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| LocationError::PositionUnavailable(format!("gpsd connect: {e}")))?;
        let (read, mut write) = stream.into_split();
        write
            .write_all(WATCH_COMMAND.as_bytes())
            .await
            .map_err(|e| LocationError::PositionUnavailable(format!("gpsd watch: {e}")))?;
        self.connection = Some((BufReader::new(read), write));
        Ok(())
    }

    fn parse_report(line: &str) -> Option<Result<Coordinate, LocationError>> {
        let report: GpsdReport = match serde_json::from_str(line) {
            Ok(r) => r,
            // VERSION banners etc. are not JSON we model; skip quietly
            Err(_) => return None,
        };
        if report.class != "TPV" {
            return None;
        }
        if report.mode.unwrap_or(0) < 2 {
            return Some(Err(LocationError::PositionUnavailable("no fix".into())));
        }
        let (Some(lat), Some(lon)) = (report.lat, report.lon) else {
            return Some(Err(LocationError::PositionUnavailable(
                "fix without position".into(),
            )));
        };
        let accuracy_m = report.epx.unwrap_or(0.0).max(report.epy.unwrap_or(0.0));
        match Coordinate::new(lat, lon, accuracy_m, now_ms()) {
            Ok(c) => Some(Ok(c)),
            // Defensive: a conforming gpsd never sends these
            Err(e) => Some(Err(LocationError::PositionUnavailable(e.to_string()))),
        }
    }
}

#[async_trait]
impl LocationStream for GpsdLocationStream {
    async fn next_sample(&mut self) -> Option<Result<Coordinate, LocationError>> {
        if self.connection.is_none() {
            if let Err(e) = self.connect().await {
                return Some(Err(e));
            }
        }

        loop {
            let Some((reader, _)) = self.connection.as_mut() else {
                return Some(Err(LocationError::Timeout));
            };

            let mut line = String::new();
            match timeout(READ_TIMEOUT, reader.read_line(&mut line)).await {
                Ok(Ok(0)) => {
                    // EOF: gpsd went away; reconnect on the next poll
                    self.connection = None;
                    return Some(Err(LocationError::Timeout));
                }
                Ok(Ok(_)) => {
                    if let Some(result) = Self::parse_report(line.trim()) {
                        return Some(result);
                    }
                    // Non-TPV chatter; keep reading
                }
                Ok(Err(_)) | Err(_) => {
                    self.connection = None;
                    return Some(Err(LocationError::Timeout));
                }
            }
        }
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

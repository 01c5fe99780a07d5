/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal status of one client.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Ran to its iteration or duration limit.
    Pass,
    /// The operation returned an error or panicked.
    Error,
    /// The client could not be started.
    Fail,
    /// A verify step returned false.
    VerifyFail,
    /// A barrier round was rejected or the barrier broke.
    SyncFail,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ClientReport {
    pub id: String,
    pub group: usize,
    pub status: Status,
    pub iterations: u64,
    #[serde(with = "ops_serde::duration")]
    pub elapsed: Duration,
    pub started: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Report {
    pub clients: Vec<ClientReport>,
}

impl Status {
    pub const ALL: [Self; 5] = [
        Self::Pass,
        Self::Error,
        Self::Fail,
        Self::VerifyFail,
        Self::SyncFail,
    ];
}

impl Report {
    pub fn new(clients: Vec<ClientReport>) -> Self {
        Self { clients }
    }

    pub fn client(&self, id: &str) -> Option<&ClientReport> {
        self.clients.iter().find(|c| c.id == id)
    }

    pub fn count(&self, status: Status) -> usize {
        self.clients.iter().filter(|c| c.status == status).count()
    }

    pub fn all_passed(&self) -> bool {
        self.clients.iter().all(|c| c.status == Status::Pass)
    }

    pub fn total_iterations(&self) -> u64 {
        self.clients.iter().map(|c| c.iterations).sum()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Pass => "PASS",
            Self::Error => "ERROR",
            Self::Fail => "FAIL",
            Self::VerifyFail => "VERIFY_FAIL",
            Self::SyncFail => "SYNC_FAIL",
        })
    }
}

impl fmt::Display for ClientReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<11} {} (group {}): {} iteration(s) in {:.3}s",
            self.status,
            self.id,
            self.group,
            self.iterations,
            self.elapsed.as_secs_f64()
        )
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for client in &self.clients {
            writeln!(f, "{}", client)?;
        }
        write!(f, "{} client(s):", self.clients.len())?;
        for status in Status::ALL {
            write!(f, " {} {}", self.count(status), status)?;
        }
        write!(f, "; {} iteration(s) total", self.total_iterations())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::{ClientReport, Report, Status};

    fn client(id: &str, status: Status, iterations: u64) -> ClientReport {
        ClientReport {
            id: id.to_string(),
            group: 0,
            status,
            iterations,
            elapsed: Duration::from_millis(250),
            started: Utc::now(),
        }
    }

    #[test]
    fn summary() {
        let report = Report::new(vec![
            client("a", Status::Pass, 3),
            client("b", Status::SyncFail, 1),
        ]);
        assert!(!report.all_passed());
        assert_eq!(report.count(Status::Pass), 1);
        assert_eq!(report.count(Status::SyncFail), 1);
        assert_eq!(report.client("b").unwrap().iterations, 1);

        let text = report.to_string();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "PASS        a (group 0): 3 iteration(s) in 0.250s");
        assert_eq!(
            lines[2],
            "2 client(s): 1 PASS 0 ERROR 0 FAIL 0 VERIFY_FAIL 1 SYNC_FAIL; \
             4 iteration(s) total"
        );
    }

    #[test]
    fn status_names() {
        assert_eq!(
            serde_json::to_value(Status::VerifyFail).unwrap(),
            serde_json::json!("VERIFY_FAIL")
        );
        assert_eq!(Status::SyncFail.to_string(), "SYNC_FAIL");
        assert!(Report::default().all_passed());
    }
}

//! Per-file reconciliation against the baseline
//!
//! ```text
//! lookup absent            -> New:       notify (check only), then insert
//! lookup found, same hash  -> Unchanged: nothing
//! lookup found, new hash   -> Changed:   renew  => update hash, content untouched
//!                                        check  => alert with diff, no mutation
//!                                        scan   => nothing
//! ```
//!
//! Exactly one of insert / update / alert / no-op happens per file. Storage
//! errors are logged and the file is skipped; notification errors are logged
//! and never affect persistence.

use crate::diff;
use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::mode::RunMode;
use crate::notify::{Notification, Notifier, NOTIFICATION_SUBJECT};
use crate::store::{BaselineStore, FileRecord, Lookup};
use std::path::Path;
use tracing::{debug, error, warn};

/// What happened to one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// New record written; `notified` is set in check mode
    Inserted { notified: bool },
    Unchanged,
    /// Hash replaced (renew)
    Renewed,
    /// Drift reported without touching the store (check)
    Alerted,
    /// Drift seen in a plain scan; nothing done
    Drifted,
    /// Storage failure, file left as it was
    Skipped,
}

pub struct Reconciler<'a> {
    store: &'a BaselineStore,
    notifier: &'a dyn Notifier,
    recipients: &'a [String],
    mode: RunMode,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        store: &'a BaselineStore,
        notifier: &'a dyn Notifier,
        recipients: &'a [String],
        mode: RunMode,
    ) -> Self {
        Self {
            store,
            notifier,
            recipients,
            mode,
        }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Reconcile one fingerprint with its baseline record
    pub fn reconcile(&self, fingerprint: &Fingerprint) -> Outcome {
        match self.try_reconcile(fingerprint) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Skipping {}: {}", fingerprint.path.display(), e);
                Outcome::Skipped
            }
        }
    }

    fn try_reconcile(&self, fingerprint: &Fingerprint) -> Result<Outcome> {
        let path = fingerprint.path.as_path();
        let lookup = self.store.find(path)?;

        debug!(
            "Current file: {}, MD5: {}, in baseline: {}",
            path.display(),
            fingerprint.hash,
            !lookup.is_absent()
        );

        let record = match lookup {
            Lookup::Absent => return self.handle_new(fingerprint),
            Lookup::Found(record) => record,
        };

        if record.hash == fingerprint.hash {
            return Ok(Outcome::Unchanged);
        }

        match self.mode {
            RunMode::Renew => {
                self.store.update_hash(path, &fingerprint.hash)?;
                debug!("Renewed {}: {} -> {}", path.display(), record.hash, fingerprint.hash);
                Ok(Outcome::Renewed)
            }
            RunMode::Check => {
                self.alert_changed(fingerprint, &record);
                Ok(Outcome::Alerted)
            }
            RunMode::Baseline => {
                debug!("Drift observed on {} (not recorded in scan mode)", path.display());
                Ok(Outcome::Drifted)
            }
        }
    }

    fn handle_new(&self, fingerprint: &Fingerprint) -> Result<Outcome> {
        let notified = self.mode == RunMode::Check;
        if notified {
            self.alert_new(fingerprint);
        }

        self.store
            .insert(&fingerprint.path, &fingerprint.hash, fingerprint.content.as_deref())?;

        Ok(Outcome::Inserted { notified })
    }

    fn alert_new(&self, fingerprint: &Fingerprint) {
        let path = &fingerprint.path;
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut body = format!(
            "New file found in {}, file name is {}, MD5: {}",
            dir.display(),
            name,
            fingerprint.hash
        );
        if let Some(content) = fingerprint.content_text().filter(|c| !c.is_empty()) {
            body.push_str("\ncontent: \n");
            body.push_str(&content);
        }

        warn!(target: "baseliner::alert", "{}", body);
        self.deliver(Notification::plain(body));
    }

    fn alert_changed(&self, fingerprint: &Fingerprint, record: &FileRecord) {
        let alert = format!(
            "Alert! path: {}, old md5: {}, new md5: {}",
            fingerprint.path.display(),
            record.hash,
            fingerprint.hash
        );

        let notification = match (record.content_text(), fingerprint.content_text()) {
            (Some(old), Some(new)) => {
                let rendered = diff::render(&old, &new);
                Notification {
                    text: format!("{}\n\ndiff: \n{}", alert, rendered.plain),
                    html: Some(format!(
                        "{}<br>diff: <br>{}",
                        diff::escape_html(&alert),
                        rendered.html
                    )),
                }
            }
            _ => Notification::plain(alert),
        };

        warn!(target: "baseliner::alert", "{}", notification.text);
        self.deliver(notification);
    }

    fn deliver(&self, notification: Notification) {
        if let Err(e) = self
            .notifier
            .send(self.recipients, NOTIFICATION_SUBJECT, &notification)
        {
            error!("{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::fingerprint::hash_bytes;
    use crate::notify::RecordingNotifier;
    use std::path::PathBuf;

    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn send(&self, _: &[String], _: &str, _: &Notification) -> Result<()> {
            Err(Error::Notify("connection refused".to_string()))
        }
    }

    fn fp(path: &str, content: &str, captured: bool) -> Fingerprint {
        Fingerprint {
            path: PathBuf::from(path),
            hash: hash_bytes(content.as_bytes()),
            content: captured.then(|| content.as_bytes().to_vec()),
            size: content.len() as u64,
        }
    }

    fn recipients() -> Vec<String> {
        vec!["ops@example.com".to_string()]
    }

    fn stored(store: &BaselineStore, path: &str) -> FileRecord {
        store.find(Path::new(path)).unwrap().into_record().unwrap()
    }

    #[test]
    fn test_new_file_inserted_without_notification() {
        let store = BaselineStore::open_in_memory().unwrap();
        let notifier = RecordingNotifier::new();
        let to = recipients();

        for mode in [RunMode::Baseline, RunMode::Renew] {
            let path = format!("/srv/{}.go", mode);
            let r = Reconciler::new(&store, &notifier, &to, mode);
            assert_eq!(
                r.reconcile(&fp(&path, "x", true)),
                Outcome::Inserted { notified: false }
            );
            assert_eq!(stored(&store, &path).content.as_deref(), Some(&b"x"[..]));
        }
        assert_eq!(notifier.count(), 0);
    }

    #[test]
    fn test_new_file_in_check_mode_notifies_then_inserts() {
        let store = BaselineStore::open_in_memory().unwrap();
        let notifier = RecordingNotifier::new();
        let to = recipients();
        let r = Reconciler::new(&store, &notifier, &to, RunMode::Check);

        let outcome = r.reconcile(&fp("/srv/app/a.go", "package main", true));
        assert_eq!(outcome, Outcome::Inserted { notified: true });
        assert_eq!(store.record_count().unwrap(), 1);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, to);
        assert_eq!(sent[0].1, NOTIFICATION_SUBJECT);
        assert!(sent[0].2.text.contains("New file found in /srv/app, file name is a.go"));
        assert!(sent[0].2.text.contains("package main"));
    }

    #[test]
    fn test_unchanged_is_noop() {
        let store = BaselineStore::open_in_memory().unwrap();
        let notifier = RecordingNotifier::new();
        let to = recipients();
        store.insert(Path::new("/a"), &hash_bytes(b"same"), None).unwrap();

        for mode in [RunMode::Baseline, RunMode::Check, RunMode::Renew] {
            let r = Reconciler::new(&store, &notifier, &to, mode);
            assert_eq!(r.reconcile(&fp("/a", "same", false)), Outcome::Unchanged);
        }
        assert_eq!(notifier.count(), 0);
    }

    #[test]
    fn test_changed_in_baseline_mode_does_nothing() {
        let store = BaselineStore::open_in_memory().unwrap();
        let notifier = RecordingNotifier::new();
        let to = recipients();
        store.insert(Path::new("/a.go"), &hash_bytes(b"x"), Some(&b"x"[..])).unwrap();

        let r = Reconciler::new(&store, &notifier, &to, RunMode::Baseline);
        assert_eq!(r.reconcile(&fp("/a.go", "y", true)), Outcome::Drifted);
        assert_eq!(stored(&store, "/a.go").hash, hash_bytes(b"x"));
        assert_eq!(notifier.count(), 0);
    }

    #[test]
    fn test_changed_in_check_mode_alerts_with_diff_and_keeps_baseline() {
        let store = BaselineStore::open_in_memory().unwrap();
        let notifier = RecordingNotifier::new();
        let to = recipients();
        store.insert(Path::new("/a.go"), &hash_bytes(b"x"), Some(&b"x"[..])).unwrap();

        let r = Reconciler::new(&store, &notifier, &to, RunMode::Check);
        assert_eq!(r.reconcile(&fp("/a.go", "y", true)), Outcome::Alerted);
        assert_eq!(r.reconcile(&fp("/a.go", "y", true)), Outcome::Alerted);

        assert_eq!(stored(&store, "/a.go").hash, hash_bytes(b"x"));

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        let body = &sent[0].2;
        assert!(body.text.contains(&hash_bytes(b"x")));
        assert!(body.text.contains(&hash_bytes(b"y")));
        assert!(body.text.contains("\n- x\n"));
        assert!(body.text.contains("\n+ y\n"));
        assert!(body.html.as_deref().unwrap().contains("<ins"));
    }

    #[test]
    fn test_changed_without_captured_content_alerts_without_diff() {
        let store = BaselineStore::open_in_memory().unwrap();
        let notifier = RecordingNotifier::new();
        let to = recipients();
        store.insert(Path::new("/bin/ls"), &hash_bytes(b"v1"), None).unwrap();

        let r = Reconciler::new(&store, &notifier, &to, RunMode::Check);
        assert_eq!(r.reconcile(&fp("/bin/ls", "v2", false)), Outcome::Alerted);

        let sent = notifier.sent();
        assert!(sent[0].2.text.starts_with("Alert! path: /bin/ls"));
        assert!(!sent[0].2.text.contains("diff:"));
        assert!(sent[0].2.html.is_none());
    }

    #[test]
    fn test_changed_in_renew_mode_updates_hash_only() {
        let store = BaselineStore::open_in_memory().unwrap();
        let notifier = RecordingNotifier::new();
        let to = recipients();
        store.insert(Path::new("/a.go"), &hash_bytes(b"x"), Some(&b"x"[..])).unwrap();

        let r = Reconciler::new(&store, &notifier, &to, RunMode::Renew);
        assert_eq!(r.reconcile(&fp("/a.go", "y", true)), Outcome::Renewed);

        let record = stored(&store, "/a.go");
        assert_eq!(record.hash, hash_bytes(b"y"));
        assert_eq!(record.content.as_deref(), Some(&b"x"[..]));
        assert_eq!(notifier.count(), 0);
    }

    #[test]
    fn test_notification_failure_does_not_block_insert() {
        let store = BaselineStore::open_in_memory().unwrap();
        let to = recipients();
        let r = Reconciler::new(&store, &FailingNotifier, &to, RunMode::Check);

        assert_eq!(
            r.reconcile(&fp("/new.txt", "hello", false)),
            Outcome::Inserted { notified: true }
        );
        assert!(!store.find(Path::new("/new.txt")).unwrap().is_absent());
    }
}

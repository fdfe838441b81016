//! JSON-lines presenter
//!
//! Writes one JSON object per line for every redraw and every event, so a
//! front end (or a log) can follow the game without linking the core.

use std::io::Write;

use serde::Serialize;
use tracing::warn;

use tetrinet_core::{Presenter, PresenterEvent, SessionSnapshot};

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Record<'a> {
    Snapshot(&'a SessionSnapshot),
    Event(&'a PresenterEvent),
}

pub struct JsonPresenter<W: Write> {
    out: W,
    buf: Vec<u8>,
}

impl<W: Write> JsonPresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            buf: Vec::with_capacity(4096),
        }
    }

    fn emit(&mut self, record: Record<'_>) {
        self.buf.clear();
        if let Err(err) = serde_json::to_writer(&mut self.buf, &record) {
            warn!(%err, "cannot serialize presenter record");
            return;
        }
        self.buf.push(b'\n');
        if let Err(err) = self.out.write_all(&self.buf).and_then(|_| self.out.flush()) {
            warn!(%err, "presenter output failed");
        }
    }
}

impl<W: Write> Presenter for JsonPresenter<W> {
    fn redraw(&mut self, snapshot: &SessionSnapshot) {
        self.emit(Record::Snapshot(snapshot));
    }

    fn event(&mut self, event: &PresenterEvent) {
        self.emit(Record::Event(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tetrinet_core::{GameParams, Session};

    #[test]
    fn test_writes_one_line_per_record() {
        let mut session = Session::new(1, "me", 3, Vec::new(), JsonPresenter::new(Vec::new()));
        session.new_game(GameParams::default());
        session.flush_redraw();
        session.send_chat("hello");

        let out = String::from_utf8(session.presenter_mut().out.clone()).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines[0]["type"], "event");
        assert_eq!(lines[0]["event"], "reset_labels");
        let snapshot = lines.iter().find(|v| v["type"] == "snapshot").unwrap();
        assert_eq!(snapshot["my_number"], 1);
        assert_eq!(snapshot["boards"][0]["rows"].as_array().unwrap().len(), 22);
        let chat = lines.last().unwrap();
        assert_eq!(chat["event"], "chat");
        assert_eq!(chat["text"], "hello");
    }
}

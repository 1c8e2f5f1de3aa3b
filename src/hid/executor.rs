//! Macro playback - turns a key's action list into a report stream.

use super::keyboard::KeyboardReport;
use super::link::ReportLink;
use crate::keypad::Position;
use crate::macros::Catalog;

/// Plays macros from the catalog over a [`ReportLink`].
///
/// Holds the running report between actions; every playback starts
/// from an empty report and always ends on one, so no key can be left
/// held on the computer side.
#[derive(Default)]
pub struct HidExecutor {
    report: KeyboardReport,
}

impl HidExecutor {
    pub const fn new() -> Self {
        Self {
            report: KeyboardReport::empty(),
        }
    }

    /// Play the macro stored at `pos`.
    ///
    /// Does nothing for auxiliary keys or macros without actions.
    /// Otherwise sends one report per action followed by one empty
    /// report. Blocks for every transfer.
    pub fn execute(&mut self, catalog: &Catalog, pos: Position, link: &mut impl ReportLink) {
        let actions = catalog.actions(pos);
        if actions.is_empty() || pos.is_auxiliary() {
            return;
        }

        debug!("Playing macro on key {} ({} actions)", pos.key_number(), actions.len());

        self.report.clear();
        for &action in actions {
            self.report.apply(action);
            link.send_report(&self.report.to_bytes());
        }

        self.report.clear();
        link.send_report(&self.report.to_bytes());
    }
}

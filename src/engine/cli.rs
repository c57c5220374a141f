//! CLI dispatch: one handler per task.

use anyhow::Result;

use crate::engine::arg_parser::Invocation;
use crate::engine::handlers::{
    handle_dump_report, handle_load_report, handle_spew, handle_summary, handle_wipe_report,
};
use crate::engine::tasks::Task;
use crate::utils::setup_logging;

pub fn handle_run(inv: &Invocation) -> Result<()> {
    setup_logging(inv.verbose());
    match inv.task {
        Task::Spew => handle_spew(inv),
        Task::DumpReport => handle_dump_report(inv),
        Task::LoadReport => handle_load_report(inv),
        Task::WipeReport => handle_wipe_report(inv),
        Task::Summary => handle_summary(inv),
    }
}

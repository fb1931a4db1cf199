use std::io;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use engine_logging::engine_debug;

use crate::service::{ChannelProgressSink, ExportService};
use crate::{EngineEvent, ExportRequest, JobId, JobProgress, Stage};

enum EngineCommand {
    Export { job_id: JobId, request: ExportRequest },
}

/// Runs export jobs on a background tokio runtime. Progress and results come
/// back as [`EngineEvent`]s.
pub struct ExportEngine {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl ExportEngine {
    pub fn new(service: Arc<ExportService>) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        thread::Builder::new()
            .name("export-engine".to_string())
            .spawn(move || {
                while let Ok(command) = cmd_rx.recv() {
                    let service = service.clone();
                    let event_tx = event_tx.clone();
                    runtime.spawn(async move {
                        handle_command(service.as_ref(), command, event_tx).await;
                    });
                }
                engine_debug!("Export engine command channel closed");
            })?;

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn enqueue(&self, job_id: JobId, request: ExportRequest) {
        let _ = self.cmd_tx.send(EngineCommand::Export { job_id, request });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

async fn handle_command(
    service: &ExportService,
    command: EngineCommand,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    match command {
        EngineCommand::Export { job_id, request } => {
            let _ = event_tx.send(EngineEvent::Progress(JobProgress {
                job_id,
                stage: Stage::Queued,
            }));
            let sink = ChannelProgressSink::new(event_tx.clone());
            let result = service.run_job(job_id, &request, &sink).await;
            let _ = event_tx.send(EngineEvent::ExportCompleted { job_id, result });
        }
    }
}

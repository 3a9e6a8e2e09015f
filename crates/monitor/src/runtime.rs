//! Per-stream session tasks
//!
//! Each stream runs as its own task. Frames from one source are processed
//! strictly in arrival order; the blocking part of the pipeline (zone
//! extraction, encoding, snapshot writes) runs on the blocking pool so other
//! streams keep moving.

use crate::session::{FrameInput, FrameReport, MonitorSession};
use crate::MonitorError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

/// Handle to a running session task
pub struct SessionHandle {
    id: Uuid,
    frames: mpsc::Sender<FrameInput>,
    reports: mpsc::Receiver<FrameReport>,
    task: JoinHandle<()>,
}

/// Start a session task with bounded input and report queues
pub fn spawn_session(session: MonitorSession, capacity: usize) -> SessionHandle {
    let id = session.id();
    let (frame_tx, mut frame_rx) = mpsc::channel::<FrameInput>(capacity.max(1));
    let (report_tx, report_rx) = mpsc::channel::<FrameReport>(capacity.max(1));

    let task = tokio::spawn(
        async move {
            info!("Session started");
            let mut session = session;

            while let Some(input) = frame_rx.recv().await {
                if report_tx.is_closed() {
                    debug!("Report receiver gone; discarding queued frames");
                    break;
                }

                let processed = tokio::task::spawn_blocking(move || {
                    let mut session = session;
                    let report = session.process(input);
                    (session, report)
                })
                .await;

                match processed {
                    Ok((returned, report)) => {
                        session = returned;
                        if report_tx.send(report).await.is_err() {
                            debug!("Report receiver dropped");
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Frame pipeline failed: {}", e);
                        break;
                    }
                }
            }

            info!("Session stopped");
        }
        .instrument(info_span!("session", id = %id)),
    );

    SessionHandle {
        id,
        frames: frame_tx,
        reports: report_rx,
        task,
    }
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Queue a frame, waiting if the session is behind
    pub async fn submit(&self, input: FrameInput) -> Result<(), MonitorError> {
        self.frames
            .send(input)
            .await
            .map_err(|_| MonitorError::SessionClosed)
    }

    /// Next processed frame; `None` once the session has ended
    pub async fn next_report(&mut self) -> Option<FrameReport> {
        self.reports.recv().await
    }

    /// Stop the session. Queued frames are discarded and no events fire.
    pub async fn stop(self) -> Result<(), MonitorError> {
        let SessionHandle {
            frames,
            reports,
            task,
            ..
        } = self;
        drop(reports);
        drop(frames);
        task.await.map_err(|e| MonitorError::Join(e.to_string()))
    }
}

//! `queuectl enqueue <json>`

use anyhow::Result;

use crate::queue::{Queue, QueueError};
use crate::store::{Job, Store};

pub async fn run_enqueue_command(store: &Store, job_json: &str) -> Result<()> {
    let job: Job = serde_json::from_str(job_json)
        .map_err(|e| anyhow::anyhow!("invalid JSON: {e}"))?;
    let id = job.id.clone();

    let queue = Queue::new(store);
    match queue.enqueue(job).await {
        Ok(()) => {
            println!("\u{2713} Job {id} enqueued successfully");
            Ok(())
        }
        Err(QueueError::DuplicateJob(id)) => {
            Err(anyhow::anyhow!("job {id} already exists"))
        }
        Err(e) => Err(e.into()),
    }
}

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use engine::{Action, ActionContext, Actor, ContinuousEngine, EngineConfig};
use tracing::info;

struct Tick {
    count: Arc<AtomicU32>,
}

impl Action for Tick {
    fn perform(&self, _context: &ActionContext) {
        let n = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        info!(n, "tick action fired");
    }
}

struct Announce(&'static str);

impl Action for Announce {
    fn perform(&self, context: &ActionContext) {
        info!(tick = context.tick_info().ticks(), "{}", self.0);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let engine = ContinuousEngine::new(EngineConfig::new(20, 2))?;
    let actor: Actor = Arc::new(());

    engine
        .shared()
        .set_first_action(Arc::new(Announce("tick starting")), actor.clone())?;
    engine
        .shared()
        .set_last_action(Arc::new(Announce("tick finished")), actor.clone())?;

    let count = Arc::new(AtomicU32::new(0));
    engine.shared().schedule(
        Arc::new(Tick {
            count: count.clone(),
        }),
        actor,
        Duration::ZERO,
        Duration::from_millis(50),
    )?;

    engine.resume()?;
    std::thread::sleep(Duration::from_secs(1));
    engine.stop();

    info!(total = count.load(Ordering::SeqCst), "demo finished");
    Ok(())
}

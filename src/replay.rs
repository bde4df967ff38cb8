//! Real-time script replay into a live gesture engine

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use camelpad_gesture::{ButtonMask, GestureEngine, RawButtonEvent};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::PadConfig;
use crate::script::{Script, Step};

/// Drive `script`, printing each gesture as it is detected.
///
/// Returns once every window has settled after the last step, or early
/// when `running` is cleared.
pub async fn run(
    config: &PadConfig,
    script: &Script,
    json: bool,
    running: Arc<AtomicBool>,
) -> Result<()> {
    let (engine, mut gestures) = GestureEngine::with_channel(config.timing)?;

    let printer_config = config.clone();
    let printer = tokio::spawn(async move {
        let mut count = 0usize;
        while let Some(gesture) = gestures.recv().await {
            count += 1;
            if json {
                match serde_json::to_string(&gesture) {
                    Ok(line) => println!("{line}"),
                    Err(e) => tracing::warn!("Failed to encode gesture: {e}"),
                }
            } else {
                println!("{:<12} {}", gesture.key(), printer_config.describe(&gesture));
            }
        }
        count
    });

    info!(
        "Replaying {} steps ({:?} of waits)",
        script.steps.len(),
        script.duration()
    );

    // Shadow of what the pad currently reports, so masks diff correctly
    let mut mask = ButtonMask::default();
    for step in &script.steps {
        if !running.load(Ordering::SeqCst) {
            info!("Interrupted");
            break;
        }
        match *step {
            Step::Wait(d) => tokio::time::sleep(d).await,
            Step::Press(button) => {
                set_bit(&mut mask, button, true);
                engine.process_event(RawButtonEvent::press(button));
            }
            Step::Release(button) => {
                set_bit(&mut mask, button, false);
                engine.process_event(RawButtonEvent::release(button));
            }
            Step::Mask(next) => {
                for event in ButtonMask::transitions(mask, next, Instant::now()) {
                    engine.process_event(event);
                }
                mask = next;
            }
        }
    }

    let settle = config.timing.settle_time();
    debug!("Waiting {:?} for pending gestures", settle);
    tokio::time::sleep(settle).await;

    engine.stop();
    drop(engine);

    let count = printer.await?;
    info!("{count} gestures detected");
    Ok(())
}

fn set_bit(mask: &mut ButtonMask, button: u8, pressed: bool) {
    if button >= ButtonMask::BUTTONS {
        return;
    }
    if pressed {
        mask.0 |= 1 << button;
    } else {
        mask.0 &= !(1 << button);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_bit() {
        let mut mask = ButtonMask::default();
        set_bit(&mut mask, 2, true);
        set_bit(&mut mask, 0, true);
        assert_eq!(mask, ButtonMask(0b101));
        set_bit(&mut mask, 2, false);
        assert_eq!(mask, ButtonMask(0b001));
        // out of range for a 16-button mask
        set_bit(&mut mask, 20, true);
        assert_eq!(mask, ButtonMask(0b001));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_runs_to_completion() {
        let script: Script = "tap 0\nwait 400\nmask 0x3\nwait 100\nmask 0\n".parse().unwrap();
        let running = Arc::new(AtomicBool::new(true));
        run(&PadConfig::default(), &script, true, running).await.unwrap();
    }
}

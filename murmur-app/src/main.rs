mod hotkey;
mod wiring;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, anyhow};
use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};

/// The two named trigger actions. Everything the hotkeys can do funnels
/// through this channel into the controller's serialized context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    StartOrStop,
    Cancel,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let home = std::env::var("HOME").context("HOME is not set")?;
    let data_dir = PathBuf::from(home).join(".murmur");

    let binding = wiring::settings_store(&data_dir)
        .load()
        .map(|s| s.hotkey)
        .unwrap_or_default();

    let controller = wiring::build_controller(&data_dir);

    // Paste needs Accessibility trust; surface the onboarding state early
    // instead of failing quietly on the first delivery.
    #[cfg(target_os = "macos")]
    if !murmur_platform::macos::is_accessibility_trusted() {
        log::warn!("Accessibility not granted; paste will fall back to clipboard-only");
        controller.mark_permissions_needed().await;
    }

    // Log state changes so a headless run is observable.
    {
        let mut status = controller.subscribe();
        tokio::spawn(async move {
            while status.changed().await.is_ok() {
                let status = status.borrow().clone();
                match &status.error_message {
                    Some(message) => log::info!("dictation: {} ({message})", status.state.label()),
                    None => log::info!("dictation: {}", status.state.label()),
                }
            }
        });
    }

    let manager = GlobalHotKeyManager::new()
        .map_err(|e| anyhow!("failed to create hotkey manager: {e}"))?;

    let toggle = hotkey::hotkey_from_binding(&binding)?;
    manager
        .register(toggle)
        .map_err(|e| anyhow!("failed to register hotkey {:?}+{}: {e}", binding.modifiers, binding.key))?;

    // Cancel is deliberately not user-configurable.
    let cancel = HotKey::new(Some(Modifiers::CONTROL), Code::Escape);
    manager
        .register(cancel)
        .map_err(|e| anyhow!("failed to register cancel hotkey: {e}"))?;

    log::info!(
        "murmur ready: {:?}+{} toggles dictation, Control+Escape cancels",
        binding.modifiers,
        binding.key
    );

    let (trigger_tx, mut trigger_rx) = tokio::sync::mpsc::unbounded_channel::<Trigger>();

    {
        let controller = controller.clone();
        tokio::spawn(async move {
            while let Some(trigger) = trigger_rx.recv().await {
                match trigger {
                    Trigger::StartOrStop => controller.request_start().await,
                    Trigger::Cancel => controller.request_cancel().await,
                }
            }
        });
    }

    let receiver = GlobalHotKeyEvent::receiver();
    loop {
        if let Ok(event) = receiver.try_recv() {
            if event.state == HotKeyState::Pressed {
                let trigger = if event.id == toggle.id() {
                    Some(Trigger::StartOrStop)
                } else if event.id == cancel.id() {
                    Some(Trigger::Cancel)
                } else {
                    None
                };
                if let Some(trigger) = trigger {
                    let _ = trigger_tx.send(trigger);
                }
            }
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("shutting down");
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(10)) => {
                // Poll interval for the hotkey channel.
            }
        }
    }

    // Tear down any in-flight recording before exiting.
    controller.request_cancel().await;
    Ok(())
}

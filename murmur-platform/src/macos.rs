// macOS clipboard + Cmd+V paste delivery.
//
// Requirements:
// - Write the transcript to NSPasteboard (it stays there on purpose, so
//   clipboard-only delivery still works when paste is unavailable).
// - Paste using CGEvent Cmd+V; this needs Accessibility trust
//   (AXIsProcessTrusted). Without it, delivery degrades to clipboard-only.
//
// This file is only compiled on macOS.

#![cfg(target_os = "macos")]

use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use core_foundation::base::TCFType;
use core_foundation::dictionary::CFDictionary;
use core_foundation::string::CFString;
use core_graphics::event::{CGEvent, CGEventFlags, CGEventTapLocation};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use objc2::runtime::AnyObject;
use objc2_app_kit::{NSPasteboard, NSPasteboardTypeString};
use objc2_foundation::NSString;

use murmur_core::MicAuthorization;
use murmur_engine::traits::{MicrophoneGate, TextDelivery};

// Let the pasteboard write propagate before the synthetic keystroke.
const CLIPBOARD_SETTLE: Duration = Duration::from_millis(50);

#[link(name = "ApplicationServices", kind = "framework")]
unsafe extern "C" {
    fn AXIsProcessTrustedWithOptions(options: *const AnyObject) -> bool;
    static kAXTrustedCheckOptionPrompt: *const AnyObject;
}

/// Whether this process may synthesize keyboard events into other apps.
pub fn is_accessibility_trusted() -> bool {
    ax_trusted(false)
}

/// Same check, but asks the OS to show its grant prompt when untrusted.
pub fn request_accessibility_trust() -> bool {
    ax_trusted(true)
}

fn ax_trusted(prompt: bool) -> bool {
    unsafe {
        let key = CFString::wrap_under_create_rule(kAXTrustedCheckOptionPrompt.cast());
        let value = if prompt {
            core_foundation::boolean::CFBoolean::true_value()
        } else {
            core_foundation::boolean::CFBoolean::false_value()
        };
        let options = CFDictionary::from_CFType_pairs(&[(key, value)]);
        AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef().cast())
    }
}

fn write_pasteboard(text: &str) {
    let pasteboard = NSPasteboard::generalPasteboard();
    unsafe {
        pasteboard.clearContents();
    }
    let ns_text = NSString::from_str(text);
    let _ = pasteboard.setString_forType(&ns_text, NSPasteboardTypeString);
}

fn post_cmd_v() -> anyhow::Result<()> {
    let src = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
        .map_err(|_| anyhow::anyhow!("failed to create CGEventSource"))?;

    // Keycodes: Command = 0x37, V = 0x09.
    let cmd_key: u16 = 0x37;
    let v_key: u16 = 0x09;

    let mut flags = CGEventFlags::CGEventFlagCommand;

    let cmd_down = CGEvent::new_keyboard_event(src.clone(), cmd_key, true)
        .map_err(|_| anyhow::anyhow!("failed to create cmd down event"))?;
    cmd_down.set_flags(flags);
    cmd_down.post(CGEventTapLocation::HID);

    let v_down = CGEvent::new_keyboard_event(src.clone(), v_key, true)
        .map_err(|_| anyhow::anyhow!("failed to create v down event"))?;
    v_down.set_flags(flags);
    v_down.post(CGEventTapLocation::HID);

    let v_up = CGEvent::new_keyboard_event(src.clone(), v_key, false)
        .map_err(|_| anyhow::anyhow!("failed to create v up event"))?;
    v_up.set_flags(flags);
    v_up.post(CGEventTapLocation::HID);

    flags.remove(CGEventFlags::CGEventFlagCommand);
    let cmd_up = CGEvent::new_keyboard_event(src, cmd_key, false)
        .map_err(|_| anyhow::anyhow!("failed to create cmd up event"))?;
    cmd_up.set_flags(flags);
    cmd_up.post(CGEventTapLocation::HID);

    Ok(())
}

/// Delivers transcripts into the frontmost app via pasteboard + Cmd+V.
#[derive(Debug, Default)]
pub struct MacTextDelivery;

#[async_trait]
impl TextDelivery for MacTextDelivery {
    async fn copy(&self, text: &str) {
        write_pasteboard(text);
    }

    async fn paste(&self, text: &str) {
        write_pasteboard(text);

        if !is_accessibility_trusted() {
            // Clipboard-only delivery; the session still counts as done.
            log::warn!(
                "Accessibility permission not granted; transcript left on the clipboard"
            );
            request_accessibility_trust();
            return;
        }

        thread::sleep(CLIPBOARD_SETTLE);
        if let Err(e) = post_cmd_v() {
            log::warn!("paste keystroke failed, transcript left on the clipboard: {e}");
        }
    }
}

/// Microphone gate for macOS.
///
/// CoreAudio raises the system microphone prompt on first capture, so there
/// is no separate pre-flight to run here; the gate reports `Granted` and
/// lets the capture path surface a denial as an engine start failure.
#[derive(Debug, Default)]
pub struct MacMicrophoneGate;

#[async_trait]
impl MicrophoneGate for MacMicrophoneGate {
    fn status(&self) -> MicAuthorization {
        MicAuthorization::Granted
    }

    async fn request(&self) -> bool {
        true
    }
}

//! Integration Tests for the Forced Recovery Sequence

#[path = "../test_utils/mod.rs"]
mod test_utils;

use std::time::Duration;
use tokio::time::Instant;

use rm01_switcher::Error;
use test_utils::*;

#[tokio::test(start_paused = true)]
async fn test_recovery_confirmed() {
    let lister = ScriptedLister::always(DEVICE);
    let launcher = ScriptedLauncher::new(
        SerialScript::connected(DEVICE).on_line("agx recovery", CONFIRMED),
    );
    let switcher = switcher_with(&unattended_config(), lister, launcher.clone());
    let mut operator = RecordingOperator::new();

    let start = Instant::now();
    switcher.force_recovery(&mut operator).await.unwrap();

    // Poll interval, one command delay, settle delay
    assert!(start.elapsed() >= Duration::from_secs(8));
    assert!(start.elapsed() < Duration::from_secs(60));

    let log = launcher.log();
    assert_eq!(
        log.writes,
        vec![b"\n".to_vec(), b"agx recovery\n".to_vec(), vec![0x14, b'q']]
    );
    assert!(!log.wrote_line("usbmux save"));
    assert_eq!(log.shutdowns, 1);
    assert!(operator.saw("✓ Inference Module is in recovery mode"));
}

#[tokio::test(start_paused = true)]
async fn test_recovery_confirmation_split_across_reads() {
    let lister = ScriptedLister::always(DEVICE);
    let launcher = ScriptedLauncher::new(
        SerialScript::connected(DEVICE)
            .on_line("agx recovery", "agx recovery\r\nForce reco")
            .on_line("agx recovery", "very mode complete\r\n"),
    );
    let switcher = switcher_with(&unattended_config(), lister, launcher);

    assert!(switcher
        .force_recovery(&mut RecordingOperator::new())
        .await
        .is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_recovery_confirmation_with_ansi_colors() {
    let lister = ScriptedLister::always(DEVICE);
    let launcher = ScriptedLauncher::new(
        SerialScript::connected(DEVICE)
            .on_line("agx recovery", "\x1b[32mForced recovery mode completed\x1b[0m\r\n"),
    );
    let switcher = switcher_with(&unattended_config(), lister, launcher);

    assert!(switcher
        .force_recovery(&mut RecordingOperator::new())
        .await
        .is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_recovery_confirmation_after_charset_reset() {
    let lister = ScriptedLister::always(DEVICE);
    let launcher = ScriptedLauncher::new(
        SerialScript::connected(DEVICE)
            .on_line("agx recovery", "\x1b7\x1b(BForced recovery mode complete\r\n"),
    );
    let switcher = switcher_with(&unattended_config(), lister, launcher.clone());

    let start = Instant::now();
    switcher
        .force_recovery(&mut RecordingOperator::new())
        .await
        .unwrap();
    assert!(start.elapsed() < Duration::from_secs(60));
    assert_eq!(launcher.log().shutdowns, 1);
}

#[tokio::test(start_paused = true)]
async fn test_recovery_prompt_names_recovery() {
    let lister = ScriptedLister::always(DEVICE);
    let launcher = ScriptedLauncher::new(
        SerialScript::connected(DEVICE).on_line("agx recovery", CONFIRMED),
    );
    let mut config = unattended_config();
    config.operator.confirm_before_switch = true;
    let switcher = switcher_with(&config, lister, launcher);
    let mut operator = RecordingOperator::new();

    switcher.force_recovery(&mut operator).await.unwrap();
    assert_eq!(
        operator.prompts,
        vec!["\nPress ENTER to start recovery...".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_recovery_timeout_is_command_timeout() {
    let lister = ScriptedLister::always(DEVICE);
    let launcher = ScriptedLauncher::new(
        SerialScript::connected(DEVICE).on_line("agx recovery", "agx recovery\r\nrebooting...\r\n"),
    );
    let switcher = switcher_with(&unattended_config(), lister, launcher.clone());

    let start = Instant::now();
    let result = switcher.force_recovery(&mut RecordingOperator::new()).await;

    match result {
        Err(Error::CommandTimeout { command, duration }) => {
            assert_eq!(command, "agx recovery");
            assert_eq!(duration, Duration::from_secs(60));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(start.elapsed() >= Duration::from_secs(60));

    let log = launcher.log();
    assert!(!log.wrote_line("usbmux save"));
    assert_eq!(log.writes.last(), Some(&vec![0x14, b'q']));
    assert_eq!(log.shutdowns, 1);
}

#[tokio::test(start_paused = true)]
async fn test_recovery_stream_closed() {
    let lister = ScriptedLister::always(DEVICE);
    let launcher = ScriptedLauncher::new(
        SerialScript::connected(DEVICE).close_on_line("agx recovery"),
    );
    let switcher = switcher_with(&unattended_config(), lister, launcher.clone());

    let result = switcher.force_recovery(&mut RecordingOperator::new()).await;
    assert!(matches!(result, Err(Error::StreamClosed { .. })));
    assert_eq!(launcher.log().shutdowns, 1);
}

#[tokio::test(start_paused = true)]
async fn test_recovery_custom_completion_pattern() {
    let lister = ScriptedLister::always(DEVICE);
    let launcher = ScriptedLauncher::new(
        SerialScript::connected(DEVICE).on_line("agx recovery", "AGX in RCM\r\n"),
    );
    let mut config = unattended_config();
    config.recovery.completion_pattern = r"in RCM".to_string();
    let switcher = switcher_with(&config, lister, launcher);

    assert!(switcher
        .force_recovery(&mut RecordingOperator::new())
        .await
        .is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_recovery_device_found_on_second_poll() {
    let lister = ScriptedLister::sequence(vec![Ok("")], DEVICE);
    let launcher = ScriptedLauncher::new(
        SerialScript::connected(DEVICE).on_line("agx recovery", CONFIRMED),
    );
    let switcher = switcher_with(&unattended_config(), lister.clone(), launcher.clone());

    switcher
        .force_recovery(&mut RecordingOperator::new())
        .await
        .unwrap();
    assert_eq!(lister.calls(), 2);
    assert_eq!(launcher.launches(), 1);
}

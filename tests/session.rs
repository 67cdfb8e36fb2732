//! Conversation loop tests
//!
//! Drives full sessions with scripted speech and fake perception.

use std::path::PathBuf;

use mobsir::{CaptureMode, CommandKind, Phase, Prompts};

mod common;

use common::{FakeCamera, FakeCaptioner, FakeFaces, FakeTranslator, Rig, Script, ScriptedInput};

const WAKE: &str = "مرحبا مبصر";
const PHOTO: &str = "التقط صورة";
const EXPLORE: &str = "استكشف المكان";
const EXIT: &str = "شكرا مبصر";

#[tokio::test]
async fn test_greets_then_waits_for_wake() {
    let rig = Rig::new();
    let input = ScriptedInput::new(["", "كيف حالك", WAKE, EXIT]);
    let mut session = rig.session(input.clone());

    let phase = session.run().await;

    let prompts = Prompts::default();
    assert_eq!(phase, Phase::Terminated);
    assert_eq!(
        rig.spoken(),
        vec![
            prompts.greeting.clone(),
            prompts.not_heard.clone(),
            prompts.menu.clone(),
            prompts.farewell,
        ]
    );
    assert_eq!(input.listens(), 4);
}

#[tokio::test]
async fn test_commands_before_wake_are_ignored() {
    let rig = Rig::new();
    let mut session = rig.session(ScriptedInput::new(Vec::<String>::new()));

    for kind in [
        CommandKind::Photo,
        CommandKind::Explore,
        CommandKind::Exit,
        CommandKind::Unrecognized,
        CommandKind::Empty,
    ] {
        assert_eq!(session.handle(kind).await, Phase::AwaitingWake);
    }

    assert!(rig.camera.modes().is_empty());
    assert_eq!(rig.captioner.calls(), 0);
}

#[tokio::test]
async fn test_only_exit_ends_an_awake_session() {
    let rig = Rig::new();
    let mut session = rig.session(ScriptedInput::new(Vec::<String>::new()));
    session.handle(CommandKind::Wake).await;

    for kind in [
        CommandKind::Unrecognized,
        CommandKind::Empty,
        CommandKind::Wake,
        CommandKind::Photo,
        CommandKind::Explore,
    ] {
        assert_eq!(session.handle(kind).await, Phase::AwaitingCommand);
    }

    assert_eq!(session.handle(CommandKind::Exit).await, Phase::Terminated);

    let spoken_at_exit = rig.spoken().len();
    assert_eq!(session.handle(CommandKind::Wake).await, Phase::Terminated);
    assert_eq!(rig.spoken().len(), spoken_at_exit);
}

#[tokio::test]
async fn test_silence_is_never_answered() {
    let rig = Rig::new();
    let input = ScriptedInput::new(["", "  ", WAKE, "", ""]);
    let mut session = rig.session(input.clone());

    let phase = session.run_until(input.exhausted()).await;

    let prompts = Prompts::default();
    assert_eq!(phase, Phase::AwaitingCommand);
    assert_eq!(rig.spoken(), vec![prompts.greeting, prompts.menu]);
}

#[tokio::test]
async fn test_recognizer_faults_count_as_silence() {
    let rig = Rig::new();
    let input = ScriptedInput::with_results([
        Err(mobsir::Error::Stt("network down".to_string())),
        Ok(WAKE.to_string()),
        Err(mobsir::Error::Audio("device busy".to_string())),
        Ok(EXIT.to_string()),
    ]);
    let mut session = rig.session(input);

    assert_eq!(session.run().await, Phase::Terminated);

    let prompts = Prompts::default();
    assert_eq!(
        rig.spoken(),
        vec![prompts.greeting, prompts.menu, prompts.farewell]
    );
}

#[tokio::test]
async fn test_speaker_failures_do_not_stop_the_session() {
    let mut rig = Rig::new();
    rig.output = common::RecordingOutput::broken();
    let mut session = rig.session(ScriptedInput::new([WAKE, EXPLORE, EXIT]));

    assert_eq!(session.run().await, Phase::Terminated);
    assert_eq!(rig.captioner.calls(), 1);
    assert_eq!(rig.spoken().last(), Some(&Prompts::default().farewell));
}

#[tokio::test]
async fn test_shutdown_while_listening() {
    let rig = Rig::new();
    let input = ScriptedInput::new([WAKE]);
    let mut session = rig.session(input.clone());

    let phase = session.run_until(input.exhausted()).await;
    assert_eq!(phase, Phase::AwaitingCommand);
    assert_eq!(input.listens(), 2);
}

#[tokio::test]
async fn test_photo_flow_names_family() {
    let mut rig = Rig::new();
    rig.faces = FakeFaces::names(&["سارة"]);
    let input = ScriptedInput::new(["", WAKE, PHOTO]);
    let mut session = rig.session(input.clone());

    let phase = session.run_until(input.exhausted()).await;

    let prompts = Prompts::default();
    let spoken = rig.spoken();
    assert_eq!(phase, Phase::AwaitingCommand);
    assert_eq!(rig.camera.modes(), vec![CaptureMode::Family]);

    let saved = spoken
        .iter()
        .position(|s| *s == prompts.photo_saved)
        .expect("confirmation not spoken");
    assert!(spoken[saved + 1].contains("سارة"));
    assert_eq!(spoken.len(), saved + 2);
}

#[tokio::test]
async fn test_command_after_name_runs_while_awake() {
    let rig = Rig::new();
    let input = ScriptedInput::new([WAKE, "مرحبا مبصر التقط صورة", "مرحبا مبصر", EXIT]);
    let mut session = rig.session(input);

    assert_eq!(session.run().await, Phase::Terminated);
    assert_eq!(rig.camera.modes(), vec![CaptureMode::Family]);

    // A bare wake phrase still re-reads the menu
    let prompts = Prompts::default();
    let menus = rig.spoken().iter().filter(|s| **s == prompts.menu).count();
    assert_eq!(menus, 2);
}

#[tokio::test]
async fn test_photo_flow_without_family() {
    for faces in [FakeFaces::names(&[]), FakeFaces::names(&[" ", ""]), FakeFaces::new(Script::Fail)] {
        let mut rig = Rig::new();
        rig.faces = faces;
        let mut session = rig.session(ScriptedInput::new(Vec::<String>::new()));
        session.handle(CommandKind::Wake).await;

        assert_eq!(session.handle(CommandKind::Photo).await, Phase::AwaitingCommand);

        let prompts = Prompts::default();
        let spoken = rig.spoken();
        assert_eq!(spoken[spoken.len() - 2..], [prompts.photo_saved, prompts.no_family]);
    }
}

#[tokio::test]
async fn test_photo_flow_capture_failure() {
    let mut rig = Rig::new();
    rig.camera = FakeCamera::new(Script::Fail);
    let mut session = rig.session(ScriptedInput::new(Vec::<String>::new()));
    session.handle(CommandKind::Wake).await;

    assert_eq!(session.handle(CommandKind::Photo).await, Phase::AwaitingCommand);
    assert_eq!(rig.spoken().last(), Some(&Prompts::default().capture_error));
    assert_eq!(rig.faces.calls(), 0);
}

#[tokio::test]
async fn test_explore_without_people_skips_faces() {
    let rig = Rig::new();
    let mut session = rig.session(ScriptedInput::new(Vec::<String>::new()));
    session.handle(CommandKind::Wake).await;

    session.handle(CommandKind::Explore).await;

    let prompts = Prompts::default();
    assert_eq!(rig.camera.modes(), vec![CaptureMode::Explore]);
    assert_eq!(rig.faces.calls(), 0);
    assert_eq!(rig.translator.inputs(), vec!["a dog in a park".to_string()]);

    let spoken = rig.spoken();
    assert_eq!(spoken[spoken.len() - 2..], [prompts.describing, "كلب في حديقة".to_string()]);
}

#[tokio::test]
async fn test_explore_capture_failure_is_isolated() {
    let mut rig = Rig::new();
    rig.camera = FakeCamera::new(Script::Fail);
    let mut session = rig.session(ScriptedInput::new(Vec::<String>::new()));
    session.handle(CommandKind::Wake).await;
    let before = rig.spoken().len();

    assert_eq!(session.handle(CommandKind::Explore).await, Phase::AwaitingCommand);

    let spoken = rig.spoken();
    assert_eq!(spoken[before..], [Prompts::default().capture_error]);
    assert_eq!(rig.captioner.calls(), 0);
    assert!(rig.translator.inputs().is_empty());
    assert_eq!(rig.faces.calls(), 0);
}

#[tokio::test]
async fn test_explore_camera_timeout_reads_as_capture_error() {
    let mut rig = Rig::new();
    rig.camera = FakeCamera::new(Script::Hang);
    let mut session = rig.session(ScriptedInput::new(Vec::<String>::new()));
    session.handle(CommandKind::Wake).await;

    session.handle(CommandKind::Explore).await;
    assert_eq!(rig.spoken().last(), Some(&Prompts::default().capture_error));
}

#[tokio::test]
async fn test_explore_caption_failure() {
    for script in [Script::Fail, Script::Hang, Script::Reply("   ".to_string())] {
        let mut rig = Rig::new();
        rig.captioner = FakeCaptioner::new(script);
        let mut session = rig.session(ScriptedInput::new(Vec::<String>::new()));
        session.handle(CommandKind::Wake).await;

        assert_eq!(session.handle(CommandKind::Explore).await, Phase::AwaitingCommand);
        assert_eq!(rig.spoken().last(), Some(&Prompts::default().caption_error));
        assert!(rig.translator.inputs().is_empty());
    }
}

#[tokio::test]
async fn test_explore_speaks_enhanced_caption_when_translation_fails() {
    let mut rig = Rig::new();
    rig.captioner = FakeCaptioner::new(Script::Reply("a woman smiling".to_string()));
    rig.faces = FakeFaces::names(&["سارة"]);
    rig.translator = FakeTranslator::new(Script::Fail);
    let mut session = rig.session(ScriptedInput::new(Vec::<String>::new()));
    session.handle(CommandKind::Wake).await;

    session.handle(CommandKind::Explore).await;

    let prompts = Prompts::default();
    let names = vec!["سارة".to_string()];
    let enhanced = prompts.caption_with_family("a woman smiling", &names);
    assert_eq!(rig.translator.inputs(), vec![enhanced.clone()]);

    let spoken = rig.spoken();
    assert_eq!(
        spoken[spoken.len() - 2..],
        [enhanced, prompts.family_addendum(&names)]
    );
}

#[tokio::test]
async fn test_explore_keeps_plain_caption_when_faces_fail() {
    let mut rig = Rig::new();
    rig.captioner = FakeCaptioner::new(Script::Reply("a man reading".to_string()));
    rig.faces = FakeFaces::new(Script::Hang);
    let mut session = rig.session(ScriptedInput::new(Vec::<String>::new()));
    session.handle(CommandKind::Wake).await;

    session.handle(CommandKind::Explore).await;

    assert_eq!(rig.faces.calls(), 1);
    assert_eq!(rig.translator.inputs(), vec!["a man reading".to_string()]);
    assert_eq!(rig.spoken().last(), Some(&"كلب في حديقة".to_string()));
}

#[tokio::test]
async fn test_repeated_flows_are_independent() {
    let mut rig = Rig::new();
    rig.camera = FakeCamera::new(Script::Reply(PathBuf::from("family/pending.png")));
    let input = ScriptedInput::new([WAKE, PHOTO, EXPLORE, PHOTO, EXIT]);
    let mut session = rig.session(input);

    assert_eq!(session.run().await, Phase::Terminated);
    assert_eq!(
        rig.camera.modes(),
        vec![CaptureMode::Family, CaptureMode::Explore, CaptureMode::Family]
    );
    assert_eq!(rig.faces.calls(), 2);
}

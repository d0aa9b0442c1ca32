//! Parses emitted MIDI bytes back and checks tick-level layout.

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};

use polypitch::midi::write_midi;
use polypitch::NoteEventTime;

fn note(start: f32, duration: f32, pitch: usize, amplitude: f32) -> NoteEventTime {
    NoteEventTime {
        start_time_seconds: start,
        duration_seconds: duration,
        pitch_midi: pitch,
        amplitude,
        pitch_bends: None,
    }
}

/// Flattens a track into (absolute_tick, event) pairs.
fn absolute_events<'a>(smf: &'a Smf) -> Vec<(u32, &'a TrackEventKind<'a>)> {
    let mut tick = 0;
    smf.tracks[0]
        .iter()
        .map(|event| {
            tick += event.delta.as_int();
            (tick, &event.kind)
        })
        .collect()
}

fn note_on_ticks(events: &[(u32, &TrackEventKind)]) -> Vec<(u32, u8, u8)> {
    events
        .iter()
        .filter_map(|(tick, kind)| match kind {
            TrackEventKind::Midi {
                message: MidiMessage::NoteOn { key, vel },
                ..
            } => Some((*tick, key.as_int(), vel.as_int())),
            _ => None,
        })
        .collect()
}

fn note_off_ticks(events: &[(u32, &TrackEventKind)]) -> Vec<(u32, u8)> {
    events
        .iter()
        .filter_map(|(tick, kind)| match kind {
            TrackEventKind::Midi {
                message: MidiMessage::NoteOff { key, .. },
                ..
            } => Some((*tick, key.as_int())),
            _ => None,
        })
        .collect()
}

#[test]
fn two_note_emission_round_trips() {
    let notes = vec![
        note(1.0, 2.0, 65, 0.5),
        note(3.0, 1.0, 75, 0.25),
    ];
    let bytes = write_midi(&notes, 120);

    let smf = Smf::parse(&bytes).expect("emitted bytes must parse");
    match smf.header.timing {
        Timing::Metrical(ppq) => assert_eq!(ppq.as_int(), 480),
        ref other => panic!("unexpected timing {:?}", other),
    }

    let events = absolute_events(&smf);

    // 120 bpm at 480 ppq is 960 ticks per second
    assert_eq!(note_on_ticks(&events), vec![(960, 65, 63), (2880, 75, 31)]);
    assert_eq!(note_off_ticks(&events), vec![(2880, 65), (3840, 75)]);

    let (end_tick, _) = events
        .iter()
        .find(|(_, kind)| matches!(kind, TrackEventKind::Meta(MetaMessage::EndOfTrack)))
        .expect("end of track present");
    assert_eq!(*end_tick, 3840);
}

#[test]
fn tempo_and_program_are_emitted_first() {
    let bytes = write_midi(&[note(0.0, 1.0, 60, 1.0)], 120);
    let smf = Smf::parse(&bytes).expect("emitted bytes must parse");
    let events = absolute_events(&smf);

    assert!(matches!(
        events[0],
        (0, TrackEventKind::Meta(MetaMessage::Tempo(tempo))) if tempo.as_int() == 500_000
    ));
    assert!(matches!(
        events[1],
        (
            0,
            TrackEventKind::Midi {
                message: MidiMessage::ProgramChange { program },
                ..
            }
        ) if program.as_int() == 0
    ));
}

#[test]
fn pitch_bends_are_spread_across_the_note() {
    let notes = vec![NoteEventTime {
        start_time_seconds: 0.0,
        duration_seconds: 1.0,
        pitch_midi: 69,
        amplitude: 1.0,
        pitch_bends: Some(vec![0, 3]),
    }];
    let bytes = write_midi(&notes, 120);
    let smf = Smf::parse(&bytes).expect("emitted bytes must parse");

    let bends: Vec<(u32, u16)> = absolute_events(&smf)
        .iter()
        .filter_map(|(tick, kind)| match kind {
            TrackEventKind::Midi {
                message: MidiMessage::PitchBend { bend },
                ..
            } => Some((*tick, bend.0.as_int())),
            _ => None,
        })
        .collect();

    // centre value first, then one semitone sharp halfway through the note
    assert_eq!(bends, vec![(0, 0x2000), (480, 0x2000 + 4096)]);
}

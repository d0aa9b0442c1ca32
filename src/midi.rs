//! Serialises note events into a standard MIDI byte stream.

use std::io::Cursor;

use midly::num::{u14, u7};
use midly::{
    Format, Header, MetaMessage, MidiMessage, PitchBend, Smf, Timing, Track, TrackEvent,
    TrackEventKind,
};

use crate::constants::{CONTOURS_BINS_PER_SEMITONE, TICKS_PER_BEAT};
use crate::decode::events::NoteEventTime;

// The emitted stream assumes the receiver's pitch-bend range is the MIDI
// default of +/-2 semitones; one contour bin is a third of a semitone.
const PITCH_BEND_RANGE_SEMITONES: f32 = 2.0;
const PITCH_BEND_CENTER: i32 = 0x2000;

// Program 0: acoustic grand piano.
const PROGRAM: u8 = 0;

#[derive(Debug, Clone)]
struct AbsoluteEvent<'a> {
    tick: u32,
    kind: TrackEventKind<'a>,
}

fn bend_to_wire(bend_bins: i32) -> u14 {
    let units_per_semitone = PITCH_BEND_CENTER as f32 / PITCH_BEND_RANGE_SEMITONES;
    let offset = (bend_bins as f32 * units_per_semitone / CONTOURS_BINS_PER_SEMITONE).round() as i32;
    u14::new((PITCH_BEND_CENTER + offset).clamp(0, 0x3fff) as u16)
}

fn note_events_to_track(notes: &[NoteEventTime], ticks_per_second: f32) -> Vec<TrackEvent<'static>> {
    let mut absolute: Vec<AbsoluteEvent> = vec![];
    for note in notes {
        let start_tick = (note.start_time_seconds * ticks_per_second).round() as u32;
        let end_tick = (note.duration_seconds * ticks_per_second).round() as u32 + start_tick;
        let velocity = (note.amplitude * 127.0) as u8;
        let key = u7::new(note.pitch_midi as u8);

        absolute.push(AbsoluteEvent {
            tick: start_tick,
            kind: TrackEventKind::Midi {
                channel: 0.into(),
                message: MidiMessage::NoteOn {
                    key,
                    vel: u7::new(velocity),
                },
            },
        });
        absolute.push(AbsoluteEvent {
            tick: end_tick,
            kind: TrackEventKind::Midi {
                channel: 0.into(),
                message: MidiMessage::NoteOff {
                    key,
                    vel: u7::new(velocity),
                },
            },
        });

        if let Some(pitch_bends) = &note.pitch_bends {
            for (i, &bend) in pitch_bends.iter().enumerate() {
                let offset_seconds = i as f32 * note.duration_seconds / pitch_bends.len() as f32;
                absolute.push(AbsoluteEvent {
                    tick: (offset_seconds * ticks_per_second) as u32 + start_tick,
                    kind: TrackEventKind::Midi {
                        channel: 0.into(),
                        message: MidiMessage::PitchBend {
                            bend: PitchBend(bend_to_wire(bend)),
                        },
                    },
                });
            }
        }
    }

    // stable: events at the same tick keep push order
    absolute.sort_by_key(|event| event.tick);

    let mut track_events = Vec::with_capacity(absolute.len());
    let mut previous_tick = 0;
    for event in absolute {
        track_events.push(TrackEvent {
            delta: (event.tick - previous_tick).into(),
            kind: event.kind,
        });
        previous_tick = event.tick;
    }

    track_events
}

/// Serialises the notes into a single-track MIDI file at the given tempo.
pub fn write_midi(notes: &[NoteEventTime], beats_per_minute: u32) -> Vec<u8> {
    let ticks_per_second = TICKS_PER_BEAT as f32 * beats_per_minute as f32 / 60.0;

    let mut smf = Smf::new(Header {
        format: Format::SingleTrack,
        timing: Timing::Metrical(TICKS_PER_BEAT.into()),
    });

    let mut track = Track::new();
    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::Tempo((60_000_000 / beats_per_minute).into())),
    });
    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Midi {
            channel: 0.into(),
            message: MidiMessage::ProgramChange {
                program: u7::new(PROGRAM),
            },
        },
    });

    for event in note_events_to_track(notes, ticks_per_second) {
        track.push(event);
    }

    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    smf.tracks.push(track);

    let mut buffer = Vec::new();
    smf.write_std(&mut Cursor::new(&mut buffer)).unwrap();

    buffer
}

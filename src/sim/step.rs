/// The step function: advances the session by one tick.
///
/// Processing order:
///   1. Message timer
///   2. Running traces: start / grow / finish the current segment
///   3. Arrived traces: count down, then queue the result modal
///
/// Each trace consumes its own path strictly in order; several traces
/// may run side by side since they only read the shared ladder.

use super::event::GameEvent;
use super::session::{Phase, Session, Trace, TraceState};

pub fn step(session: &mut Session) -> Vec<GameEvent> {
    let mut events: Vec<GameEvent> = Vec::new();
    session.anim_tick = session.anim_tick.wrapping_add(1);

    if session.message_timer > 0 {
        session.message_timer -= 1;
        if session.message_timer == 0 { session.message.clear(); }
    }

    if session.phase != Phase::Game { return events; }

    let segment_ticks = session.speed.segment_ticks();
    let delay_ticks = session.speed.result_delay_ticks();
    let mut revealed: Vec<(usize, usize)> = vec![];

    for trace in &mut session.traces {
        match trace.state {
            TraceState::Running => advance(trace, segment_ticks, delay_ticks, &mut events),
            TraceState::Arrived { ticks_left: 0 } => {
                trace.state = TraceState::Revealed;
                revealed.push((trace.participant, trace.path.final_column));
            }
            TraceState::Arrived { ticks_left } => {
                trace.state = TraceState::Arrived { ticks_left: ticks_left - 1 };
            }
            TraceState::Revealed => {}
        }
    }

    for (participant, final_column) in revealed {
        if let Some(reveal) = session.reveal_for(participant, final_column) {
            events.push(GameEvent::ResultRevealed { participant, win: reveal.win });
            session.reveals.push_back(reveal);
        }
    }

    events
}

fn advance(trace: &mut Trace, segment_ticks: u32, delay_ticks: u32, events: &mut Vec<GameEvent>) {
    let kind = match trace.path.segments.get(trace.segment) {
        Some(seg) => seg.kind(),
        None => {
            trace.state = TraceState::Arrived { ticks_left: delay_ticks };
            return;
        }
    };

    if trace.segment_tick == 0 {
        events.push(GameEvent::SegmentStarted { participant: trace.participant, kind });
    }

    trace.segment_tick += 1;
    if trace.segment_tick < segment_ticks { return; }

    trace.segment += 1;
    trace.segment_tick = 0;
    if trace.segment >= trace.path.segments.len() {
        trace.state = TraceState::Arrived { ticks_left: delay_ticks };
        events.push(GameEvent::TraceFinished {
            participant: trace.participant,
            final_column: trace.path.final_column,
        });
    }
}

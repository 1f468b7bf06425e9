use ansi_term::{Colour, Style};

use crate::accounting::{
    display::DisplayState,
    notifier::{NotificationEvent, NotificationKind},
    pause::TimerState,
};

pub fn render_status(state: &DisplayState) -> String {
    let (label, colour) = match state.timer_state {
        TimerState::Running => ("running", Colour::Green),
        TimerState::PausedManual => ("paused", Colour::Yellow),
        TimerState::PausedByLock => ("paused while locked", Colour::Yellow),
        TimerState::Stopped => ("stopped", Colour::Fixed(8)),
    };
    let remaining_style = if state.is_expired {
        Colour::Red.bold()
    } else if state.is_overtime {
        Colour::Yellow.normal()
    } else {
        Style::new()
    };

    format!(
        "Timer      {}\nElapsed    {}\nRemaining  {}{}",
        colour.paint(label),
        state.elapsed_formatted,
        remaining_style.paint(state.remaining_formatted.as_str()),
        if state.is_overtime { " (overtime)" } else { "" },
    )
}

pub fn render_notification(event: &NotificationEvent) -> String {
    let colour = match event.kind {
        NotificationKind::TenMinutesRemaining => Colour::Yellow,
        NotificationKind::BudgetExpired | NotificationKind::BudgetExpiredRepeat => Colour::Red,
        NotificationKind::OvertimeExpired | NotificationKind::OvertimeExpiredRepeat => {
            Colour::Purple
        }
    };
    colour.paint(event.message()).to_string()
}

#[cfg(test)]
mod tests {
    use crate::accounting::{
        display::{DisplayInput, DisplayState},
        pause::TimerState,
    };

    use super::render_status;

    #[test]
    fn status_shows_labels() {
        let state = DisplayState::from(DisplayInput {
            seconds_elapsed: 3000,
            maximum_seconds: 3600,
            maximum_overtime_seconds: 0,
            overtime_active: false,
            timer_state: TimerState::PausedManual,
        });
        let rendered = render_status(&state);

        assert!(rendered.contains("00:50:00"));
        assert!(rendered.contains("00:10:00"));
        assert!(rendered.contains("paused"));
        assert!(!rendered.contains("overtime"));
    }
}

use crate::libquiz::model::{Quiz, DEFAULT_TIME};
use crate::libquiz::render::{QuestionView, Render, Reveal};
use crate::libquiz::schedule::Slot;
use crate::libquiz::scoring::compute_score;
use crate::libquiz::timer::{Countdown, Tick, TICK};
use log::debug;
use std::time::{Duration, Instant};

pub const ADVANCE_DELAY: Duration = Duration::from_millis(1200);
pub const EMPTY_QUIZ_MESSAGE: &str = "No questions in this quiz";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    AwaitingAnswer(usize),
    Resolved(usize),
    EndScreen,
    Empty,
}

/// Runtime state of one playback of one quiz.
#[derive(Debug)]
pub struct PlaySession<'q> {
    quiz: &'q Quiz,
    current_index: usize,
    countdown: Countdown,
    total_score: u64,
    answered: bool,
}

impl<'q> PlaySession<'q> {
    fn new(quiz: &'q Quiz) -> Self {
        Self {
            quiz,
            current_index: 0,
            countdown: Countdown::new(),
            total_score: 0,
            answered: false,
        }
    }
}

/// Drives a quiz question by question. Time only moves when the caller passes
/// `now` in; `next_deadline` says when the next `poll` is needed.
pub struct Player<'q, R: Render> {
    session: PlaySession<'q>,
    phase: Phase,
    ticker: Slot,
    advance: Slot,
    renderer: R,
}

impl<'q, R: Render> Player<'q, R> {
    pub fn new(quiz: &'q Quiz, renderer: R) -> Self {
        Self {
            session: PlaySession::new(quiz),
            phase: Phase::NotStarted,
            ticker: Slot::new(),
            advance: Slot::new(),
            renderer,
        }
    }

    pub fn start(&mut self, now: Instant) {
        if self.phase != Phase::NotStarted {
            debug!("[Player] Already started, ignoring start");
            return;
        }
        self.renderer.update_score(self.session.total_score);
        if self.session.quiz.questions.is_empty() {
            debug!("[Player] Quiz '{}' has no questions", self.session.quiz.id);
            self.phase = Phase::Empty;
            self.renderer.show_empty_state(EMPTY_QUIZ_MESSAGE);
            return;
        }
        self.render(0, now);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::EndScreen | Phase::Empty)
    }

    pub fn total_score(&self) -> u64 {
        self.session.total_score
    }

    pub fn current_index(&self) -> usize {
        self.session.current_index
    }

    pub fn time_left(&self) -> f64 {
        self.session.countdown.time_left()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.ticker.due(), self.advance.due()) {
            (Some(tick), Some(advance)) => Some(tick.min(advance)),
            (tick, advance) => tick.or(advance),
        }
    }

    /// Fires every scheduled task whose deadline is at or before `now`, oldest first.
    /// Each task runs at its own deadline, so a late poll replays what was missed.
    pub fn poll(&mut self, now: Instant) {
        while let Some(due) = self.next_deadline().filter(|due| *due <= now) {
            if self.ticker.due() == Some(due) && self.ticker.fire_if_due(due) {
                self.on_tick(due);
            } else if self.advance.fire_if_due(due) {
                self.on_advance(due);
            }
        }
    }

    /// Locks in `choice` for the current question. Returns `None` when the
    /// question is already finalized or no question is showing.
    /// Tasks due by `now` run first, so an answer after the deadline loses to the expiry.
    pub fn select(&mut self, choice: usize, now: Instant) -> Option<Reveal> {
        self.poll(now);
        let Phase::AwaitingAnswer(index) = self.phase else {
            debug!("[Player] Ignoring choice {} in {:?}", choice, self.phase);
            return None;
        };
        if self.session.answered {
            return None;
        }
        self.session.answered = true;
        self.ticker.cancel();
        self.session.countdown.stop();

        let quiz = self.session.quiz;
        let question = &quiz.questions[index];
        let remaining = self.session.countdown.time_left().ceil().max(0.0);
        let is_correct = question.is_correct(choice);
        let awarded = if is_correct {
            compute_score(question, remaining, quiz, Some(self.session.countdown.limit()))
        } else {
            0
        };
        self.session.total_score += awarded;
        debug!(
            "[Player] Q{} choice {} correct={} +{} (remaining {}s)",
            index + 1,
            choice,
            is_correct,
            awarded,
            remaining
        );

        let reveal = Reveal {
            correct: question.correct_index(),
            selected: (!is_correct && choice < question.choices.len()).then_some(choice),
            is_correct,
            awarded,
            timed_out: false,
        };
        self.renderer.reveal_answer(&reveal);
        self.renderer.update_score(self.session.total_score);
        self.resolve(index, now);
        Some(reveal)
    }

    fn render(&mut self, index: usize, now: Instant) {
        self.ticker.cancel();
        self.advance.cancel();
        self.session.countdown.stop();
        self.session.answered = false;
        self.session.current_index = index;

        let quiz = self.session.quiz;
        let question = &quiz.questions[index];
        self.renderer.render_question(&QuestionView::new(
            quiz.display_title(),
            question,
            index,
            quiz.questions.len(),
        ));

        let limit = question
            .time_limit
            .filter(|t| *t != 0.0)
            .or(quiz.default_time.filter(|t| *t != 0.0))
            .unwrap_or(DEFAULT_TIME);
        let update = self.session.countdown.start(limit);
        self.renderer.update_timer(update);
        self.ticker.arm_repeating(now, TICK);
        self.phase = Phase::AwaitingAnswer(index);
    }

    fn on_tick(&mut self, at: Instant) {
        match self.session.countdown.tick() {
            Tick::Idle => self.ticker.cancel(),
            Tick::Running(update) => self.renderer.update_timer(update),
            Tick::Expired(update) => {
                self.renderer.update_timer(update);
                self.ticker.cancel();
                self.expire(at);
            }
        }
    }

    fn expire(&mut self, at: Instant) {
        let Phase::AwaitingAnswer(index) = self.phase else {
            return;
        };
        if self.session.answered {
            return;
        }
        self.session.answered = true;
        debug!("[Player] Q{} timed out", index + 1);

        let question = &self.session.quiz.questions[index];
        self.renderer.reveal_answer(&Reveal {
            correct: question.correct_index(),
            selected: None,
            is_correct: false,
            awarded: 0,
            timed_out: true,
        });
        self.resolve(index, at);
    }

    fn resolve(&mut self, index: usize, at: Instant) {
        self.phase = Phase::Resolved(index);
        self.advance.arm_once(at, ADVANCE_DELAY);
    }

    fn on_advance(&mut self, at: Instant) {
        let Phase::Resolved(index) = self.phase else {
            return;
        };
        if index + 1 < self.session.quiz.questions.len() {
            self.render(index + 1, at);
        } else {
            self.end();
        }
    }

    fn end(&mut self) {
        self.ticker.cancel();
        self.advance.cancel();
        self.session.countdown.stop();
        self.phase = Phase::EndScreen;
        debug!("[Player] Finished with {} points", self.session.total_score);
        self.renderer.show_end_screen(self.session.total_score);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libquiz::model::{Choice, Question};
    use crate::libquiz::timer::{TimerUpdate, MAX_TIME_LIMIT};

    #[derive(Debug, Clone, PartialEq)]
    enum Command {
        Question(usize, String),
        Timer(TimerUpdate),
        Reveal(Reveal),
        Score(u64),
        End(u64),
        Empty(String),
    }

    #[derive(Default)]
    struct Recorder {
        commands: Vec<Command>,
    }

    impl Recorder {
        fn reveals(&self) -> Vec<Reveal> {
            self.commands
                .iter()
                .filter_map(|c| match c {
                    Command::Reveal(r) => Some(*r),
                    _ => None,
                })
                .collect()
        }

        fn timer_updates(&self) -> usize {
            self.commands
                .iter()
                .filter(|c| matches!(c, Command::Timer(_)))
                .count()
        }
    }

    impl Render for Recorder {
        fn render_question(&mut self, view: &QuestionView<'_>) {
            self.commands
                .push(Command::Question(view.index, view.prompt.to_string()));
        }
        fn update_timer(&mut self, update: TimerUpdate) {
            self.commands.push(Command::Timer(update));
        }
        fn reveal_answer(&mut self, reveal: &Reveal) {
            self.commands.push(Command::Reveal(*reveal));
        }
        fn update_score(&mut self, total: u64) {
            self.commands.push(Command::Score(total));
        }
        fn show_end_screen(&mut self, total: u64) {
            self.commands.push(Command::End(total));
        }
        fn show_empty_state(&mut self, message: &str) {
            self.commands.push(Command::Empty(message.to_string()));
        }
    }

    fn question(prompt: &str, time_limit: Option<f64>) -> Question {
        let mut question: Question = serde_json::from_str("{}").unwrap();
        question.prompt = prompt.to_string();
        question.time_limit = time_limit;
        question.choices = vec![
            Choice { text: "right".into(), is_correct: true },
            Choice { text: "wrong".into(), is_correct: false },
            Choice { text: "also wrong".into(), is_correct: false },
        ];
        question
    }

    fn quiz(count: usize) -> Quiz {
        let mut quiz = Quiz::new("quiz_test".into(), "Test");
        quiz.questions = (0..count)
            .map(|i| question(&format!("Q{}", i + 1), Some(20.0)))
            .collect();
        quiz
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn empty_quiz_goes_straight_to_empty_state() {
        let quiz = quiz(0);
        let mut player = Player::new(&quiz, Recorder::default());
        player.start(Instant::now());
        assert_eq!(player.phase(), Phase::Empty);
        assert!(player.is_finished());
        assert_eq!(player.next_deadline(), None);
        assert!(player
            .renderer()
            .commands
            .contains(&Command::Empty(EMPTY_QUIZ_MESSAGE.to_string())));
        assert_eq!(player.renderer().timer_updates(), 0);
    }

    #[test]
    fn start_renders_first_question_and_arms_ticker() {
        let quiz = quiz(2);
        let t0 = Instant::now();
        let mut player = Player::new(&quiz, Recorder::default());
        player.start(t0);
        assert_eq!(player.phase(), Phase::AwaitingAnswer(0));
        assert_eq!(player.next_deadline(), Some(t0 + TICK));
        assert_eq!(
            player.renderer().commands,
            vec![
                Command::Score(0),
                Command::Question(0, "Q1".into()),
                Command::Timer(TimerUpdate { seconds_ceil: 20, fraction: 1.0 }),
            ]
        );
    }

    #[test]
    fn instant_correct_answer_scores_full_points() {
        let quiz = quiz(1);
        let t0 = Instant::now();
        let mut player = Player::new(&quiz, Recorder::default());
        player.start(t0);
        let reveal = player.select(0, t0).unwrap();
        assert!(reveal.is_correct);
        assert_eq!(reveal.awarded, 1000);
        assert_eq!(player.total_score(), 1000);
    }

    #[test]
    fn speed_bonus_decays_with_elapsed_ticks() {
        let quiz = quiz(1);
        let t0 = Instant::now();
        let mut player = Player::new(&quiz, Recorder::default());
        player.start(t0);
        player.poll(t0 + ms(10_000));
        assert_eq!(player.time_left(), 10.0);
        let reveal = player.select(0, t0 + ms(10_000)).unwrap();
        assert_eq!(reveal.awarded, 750);
    }

    #[test]
    fn remaining_time_rounds_up() {
        let quiz = quiz(1);
        let t0 = Instant::now();
        let mut player = Player::new(&quiz, Recorder::default());
        player.start(t0);
        player.poll(t0 + ms(600));
        assert!((player.time_left() - 19.4).abs() < 1e-9);
        assert_eq!(player.select(0, t0 + ms(600)).unwrap().awarded, 1000);
    }

    #[test]
    fn wrong_answer_reveals_both_and_scores_nothing() {
        let quiz = quiz(1);
        let t0 = Instant::now();
        let mut player = Player::new(&quiz, Recorder::default());
        player.start(t0);
        let reveal = player.select(2, t0).unwrap();
        assert_eq!(
            reveal,
            Reveal {
                correct: Some(0),
                selected: Some(2),
                is_correct: false,
                awarded: 0,
                timed_out: false,
            }
        );
        assert_eq!(player.total_score(), 0);
        assert_eq!(player.renderer().commands.last(), Some(&Command::Score(0)));
    }

    #[test]
    fn out_of_range_choice_is_a_wrong_answer() {
        let quiz = quiz(1);
        let t0 = Instant::now();
        let mut player = Player::new(&quiz, Recorder::default());
        player.start(t0);
        let reveal = player.select(7, t0).unwrap();
        assert!(!reveal.is_correct);
        assert_eq!(reveal.selected, None);
        assert_eq!(reveal.correct, Some(0));
    }

    #[test]
    fn second_selection_is_ignored() {
        let quiz = quiz(2);
        let t0 = Instant::now();
        let mut player = Player::new(&quiz, Recorder::default());
        player.start(t0);
        assert!(player.select(1, t0).is_some());
        assert!(player.select(0, t0 + ms(10)).is_none());
        assert_eq!(player.total_score(), 0);
        assert_eq!(player.renderer().reveals().len(), 1);
    }

    #[test]
    fn answer_cancels_expiry() {
        let quiz = quiz(1);
        let t0 = Instant::now();
        let mut player = Player::new(&quiz, Recorder::default());
        player.start(t0);
        player.select(0, t0 + ms(100));
        let updates = player.renderer().timer_updates();
        player.poll(t0 + ms(25_000));
        let reveals = player.renderer().reveals();
        assert_eq!(reveals.len(), 1);
        assert!(!reveals[0].timed_out);
        assert_eq!(player.renderer().timer_updates(), updates);
        assert_eq!(player.total_score(), 1000);
    }

    #[test]
    fn expiry_locks_out_late_answers() {
        let quiz = quiz(2);
        let t0 = Instant::now();
        let mut player = Player::new(&quiz, Recorder::default());
        player.start(t0);
        player.poll(t0 + ms(20_000));
        assert_eq!(player.phase(), Phase::Resolved(0));
        assert_eq!(
            player.renderer().reveals(),
            vec![Reveal {
                correct: Some(0),
                selected: None,
                is_correct: false,
                awarded: 0,
                timed_out: true,
            }]
        );
        assert!(player.select(0, t0 + ms(20_000)).is_none());
        assert_eq!(player.total_score(), 0);
        assert_eq!(player.next_deadline(), Some(t0 + ms(21_200)));
    }

    #[test]
    fn answer_after_deadline_loses_to_expiry() {
        let quiz = quiz(1);
        let t0 = Instant::now();
        let mut player = Player::new(&quiz, Recorder::default());
        player.start(t0);
        assert!(player.select(0, t0 + ms(25_000)).is_none());
        assert_eq!(player.total_score(), 0);
        assert_eq!(player.phase(), Phase::EndScreen);
        let reveals = player.renderer().reveals();
        assert_eq!(reveals.len(), 1);
        assert!(reveals[0].timed_out);
        assert_eq!(player.renderer().commands.last(), Some(&Command::End(0)));
    }

    #[test]
    fn overdue_ticks_run_before_scoring() {
        let two = quiz(2);
        let t0 = Instant::now();
        let mut player = Player::new(&two, Recorder::default());
        player.start(t0);
        let reveal = player.select(0, t0 + ms(19_999)).unwrap();
        assert!(reveal.is_correct);
        assert!(!reveal.timed_out);
        assert_eq!(reveal.awarded, 525);

        let mut player = Player::new(&two, Recorder::default());
        player.start(t0);
        assert!(player.select(0, t0 + ms(20_500)).is_none());
        assert_eq!(player.phase(), Phase::Resolved(0));
        assert_eq!(player.total_score(), 0);
    }

    #[test]
    fn huge_time_limit_plays_without_overflow() {
        let mut quiz = quiz(1);
        quiz.questions[0].time_limit = Some(1e12);
        let t0 = Instant::now();
        let mut player = Player::new(&quiz, Recorder::default());
        player.start(t0);
        assert_eq!(player.time_left(), MAX_TIME_LIMIT as f64);
        let reveal = player.select(0, t0 + ms(1000)).unwrap();
        assert!(reveal.is_correct);
        assert_eq!(reveal.awarded, 500);
    }

    #[test]
    fn advances_after_delay_then_ends() {
        let quiz = quiz(2);
        let t0 = Instant::now();
        let mut player = Player::new(&quiz, Recorder::default());
        player.start(t0);
        player.select(0, t0);
        player.poll(t0 + ms(1_199));
        assert_eq!(player.phase(), Phase::Resolved(0));
        player.poll(t0 + ms(1_200));
        assert_eq!(player.phase(), Phase::AwaitingAnswer(1));
        assert_eq!(player.current_index(), 1);
        assert_eq!(player.time_left(), 20.0);

        player.select(1, t0 + ms(2_000));
        player.poll(t0 + ms(3_200));
        assert_eq!(player.phase(), Phase::EndScreen);
        assert!(player.is_finished());
        assert_eq!(player.next_deadline(), None);
        assert_eq!(player.renderer().commands.last(), Some(&Command::End(1000)));
    }

    #[test]
    fn nothing_happens_after_end_screen() {
        let quiz = quiz(1);
        let t0 = Instant::now();
        let mut player = Player::new(&quiz, Recorder::default());
        player.start(t0);
        player.select(0, t0);
        player.poll(t0 + ADVANCE_DELAY);
        assert_eq!(player.phase(), Phase::EndScreen);
        let seen = player.renderer().commands.len();
        assert!(player.select(0, t0 + ms(5_000)).is_none());
        player.poll(t0 + ms(60_000));
        assert_eq!(player.renderer().commands.len(), seen);
        assert_eq!(player.total_score(), 1000);
    }

    #[test]
    fn late_poll_replays_a_whole_quiz_of_timeouts() {
        let quiz = quiz(3);
        let t0 = Instant::now();
        let mut player = Player::new(&quiz, Recorder::default());
        player.start(t0);
        player.poll(t0 + ms(10 * 60 * 1000));
        assert_eq!(player.phase(), Phase::EndScreen);
        assert_eq!(player.renderer().reveals().len(), 3);
        assert!(player.renderer().reveals().iter().all(|r| r.timed_out));
        assert_eq!(player.total_score(), 0);
    }

    #[test]
    fn time_limit_falls_back_to_quiz_default_then_twenty() {
        let t0 = Instant::now();
        for (default_time, expected) in [(Some(8.0), 8.0), (Some(0.0), 20.0), (None, 20.0)] {
            let mut quiz = quiz(0);
            quiz.default_time = default_time;
            quiz.questions.push(question("Q1", None));
            let mut player = Player::new(&quiz, Recorder::default());
            player.start(t0);
            assert_eq!(player.time_left(), expected);
        }
    }

    #[test]
    fn select_before_start_is_ignored() {
        let quiz = quiz(1);
        let mut player = Player::new(&quiz, Recorder::default());
        assert!(player.select(0, Instant::now()).is_none());
        assert_eq!(player.phase(), Phase::NotStarted);
    }
}

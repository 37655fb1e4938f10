//! Rock, paper, scissors against a random opponent.

use std::fmt;

use async_trait::async_trait;
use panel_protocol::ButtonStyle;
use rand::Rng;

use crate::control::Control;
use crate::session::{
    ActivationContext, ERROR_NOTICE, Flow, SessionError, SessionKind, StopReason,
};

/// Picks the opponent's move for each round.
pub type Opponent = Box<dyn FnMut() -> Choice + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Rock,
    Paper,
    Scissors,
}

impl Choice {
    pub const ALL: [Choice; 3] = [Choice::Rock, Choice::Paper, Choice::Scissors];

    /// Control key for this choice.
    pub fn key(self) -> &'static str {
        match self {
            Choice::Rock => "r",
            Choice::Paper => "p",
            Choice::Scissors => "s",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Choice::Rock => "🪨",
            Choice::Paper => "📄",
            Choice::Scissors => "✂️",
        }
    }

    pub fn beats(self, other: Choice) -> bool {
        matches!(
            (self, other),
            (Choice::Rock, Choice::Scissors)
                | (Choice::Scissors, Choice::Paper)
                | (Choice::Paper, Choice::Rock)
        )
    }

    /// Uniformly random choice.
    pub fn random() -> Choice {
        Choice::ALL[rand::rng().random_range(0..Choice::ALL.len())]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    Win,
    Lose,
    Draw,
}

impl RoundOutcome {
    pub fn decide(you: Choice, bot: Choice) -> Self {
        if you == bot {
            RoundOutcome::Draw
        } else if you.beats(bot) {
            RoundOutcome::Win
        } else {
            RoundOutcome::Lose
        }
    }
}

impl fmt::Display for RoundOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundOutcome::Win => write!(f, "You win!"),
            RoundOutcome::Lose => write!(f, "You lose!"),
            RoundOutcome::Draw => write!(f, "Draw!"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpsAction {
    Play(Choice),
    EndGame,
}

/// One game. Counts the owner's wins across rounds.
pub struct RockPaperScissors {
    wins: u32,
    opponent: Opponent,
}

impl RockPaperScissors {
    pub fn new() -> Self {
        Self::with_opponent(Box::new(Choice::random))
    }

    pub fn with_opponent(opponent: Opponent) -> Self {
        Self { wins: 0, opponent }
    }

    pub fn wins(&self) -> u32 {
        self.wins
    }

    /// Play one round and return the line reported to the player.
    pub fn play(&mut self, you: Choice) -> String {
        let bot = (self.opponent)();
        let outcome = RoundOutcome::decide(you, bot);
        if outcome == RoundOutcome::Win {
            self.wins += 1;
        }
        format!("{} vs {} - {}", you.emoji(), bot.emoji(), outcome)
    }
}

impl Default for RockPaperScissors {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionKind for RockPaperScissors {
    type Action = RpsAction;

    fn name(&self) -> &'static str {
        "rps"
    }

    fn controls(&self) -> Vec<Control<RpsAction>> {
        let style = |choice: Choice| match choice {
            Choice::Rock => ButtonStyle::Secondary,
            Choice::Paper => ButtonStyle::Success,
            Choice::Scissors => ButtonStyle::Primary,
        };

        let mut controls: Vec<_> = Choice::ALL
            .into_iter()
            .map(|choice| {
                Control::new(choice.key(), RpsAction::Play(choice))
                    .emoji(choice.emoji())
                    .style(style(choice))
            })
            .collect();
        controls.push(
            Control::new("end", RpsAction::EndGame)
                .label("End game")
                .emoji("✖️")
                .style(ButtonStyle::Danger),
        );
        controls
    }

    fn initial_content(&self) -> Option<String> {
        Some("Rock, Paper, Scissors!".to_string())
    }

    fn unauthorized_notice(&self) -> &str {
        "This isn't your game!"
    }

    async fn handle(
        &mut self,
        action: RpsAction,
        ctx: &mut ActivationContext<'_>,
    ) -> Result<Flow, SessionError> {
        match action {
            RpsAction::Play(choice) => {
                let line = self.play(choice);
                ctx.respond_privately(line).await?;
                Ok(Flow::Continue)
            }
            RpsAction::EndGame => Ok(Flow::Stop),
        }
    }

    fn on_stop(&self, reason: StopReason) -> Option<String> {
        match reason {
            StopReason::Explicit => Some(format!("You won {} times!", self.wins)),
            StopReason::Timeout => Some(format!("Timed out! You won {} times!", self.wins)),
            StopReason::Error => Some(ERROR_NOTICE.to_string()),
        }
    }
}

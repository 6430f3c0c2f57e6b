//! Bot-vs-bot game loop.

use crate::config::CliConfig;
use anyhow::{anyhow, Context};
use catan_core::awards;
use catan_core::board::PLAYER_COUNT;
use catan_core::{Bot, GameConfig, GameEvent, GameState, PlayerId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

pub struct Runner {
    game: GameState,
    bots: Vec<Bot>,
    rng: StdRng,
    max_turns: u32,
    pub seed: u64,
}

impl Runner {
    pub fn new(config: &CliConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let game = GameState::new(&GameConfig::all_bots(), &mut rng);
        let bots = (0..PLAYER_COUNT as PlayerId)
            .map(|id| Bot::with_seed(id, config.difficulty, seed.wrapping_add(id as u64 + 1)))
            .collect();

        Self {
            game,
            bots,
            rng,
            max_turns: config.max_turns,
            seed,
        }
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    /// Let whoever the game waits on act once. Returns false when the game
    /// is over or the turn cap is reached.
    pub fn step(&mut self) -> anyhow::Result<bool> {
        if self.game.turn > self.max_turns {
            return Ok(false);
        }
        let Some(player) = self.game.awaiting_player() else {
            return Ok(false);
        };

        let bot = &mut self.bots[player as usize];
        let action = bot.choose_action(&self.game).ok_or_else(|| {
            anyhow!(
                "player {} has no valid action in phase {:?}",
                player,
                self.game.phase
            )
        })?;

        debug!(player, ?action, "bot action");
        let events = self
            .game
            .apply_action(player, action.clone(), &mut self.rng)
            .with_context(|| format!("player {} chose rejected action {:?}", player, action))?;

        for event in &events {
            match event {
                GameEvent::LongestRoadChanged { .. }
                | GameEvent::LargestArmyChanged { .. }
                | GameEvent::GameWon { .. } => info!("{}", event),
                GameEvent::TurnEnded { turn, .. } => debug!(turn, "turn ended"),
                _ => {}
            }
        }
        Ok(true)
    }

    /// Play until someone wins or the turn cap is hit
    pub fn run(&mut self) -> anyhow::Result<&GameState> {
        info!(seed = self.seed, max_turns = self.max_turns, "starting game");
        while self.step()? {}

        for player in &self.game.players {
            info!(
                player = player.id,
                name = %player.name,
                victory_points = awards::calculate_vp(player, &self.game),
                longest_road = player.longest_road,
                knights = player.knights_played,
                "final standing"
            );
        }
        match self.game.winner {
            Some(winner) => info!(winner, turn = self.game.turn, "game finished"),
            None => info!(turn = self.game.turn, "turn limit reached without a winner"),
        }
        Ok(&self.game)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catan_core::BotDifficulty;

    fn config(seed: u64, difficulty: BotDifficulty) -> CliConfig {
        CliConfig {
            seed: Some(seed),
            max_turns: 60,
            snapshot: None,
            difficulty,
        }
    }

    #[test]
    fn test_medium_game_runs_to_an_end() {
        let mut runner = Runner::new(&config(7, BotDifficulty::Medium));
        let game = runner.run().unwrap();

        assert!(game.is_finished() || game.turn > 60);
        assert!(!game.log.is_empty());
        for id in 0..PLAYER_COUNT as PlayerId {
            assert!(game.board.buildings_of(id).count() >= 2);
        }
    }

    #[test]
    fn test_easy_game_runs_to_an_end() {
        let mut runner = Runner::new(&config(11, BotDifficulty::Easy));
        let game = runner.run().unwrap();
        assert!(game.is_finished() || game.turn > 60);
    }

    #[test]
    fn test_same_seed_replays_the_same_game() {
        let mut first = Runner::new(&config(3, BotDifficulty::Medium));
        let mut second = Runner::new(&config(3, BotDifficulty::Medium));
        for _ in 0..200 {
            first.step().unwrap();
            second.step().unwrap();
        }
        assert_eq!(first.game().board, second.game().board);
        assert_eq!(first.game().players, second.game().players);
    }
}

/// Events emitted during a simulation step.
/// The host consumes these for sound cues; the engine uses them to force
/// an immediate snapshot.

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    Jumped,
    CoinCollected { total: u32 },
    PowerUp { level: u32 },
    BlockBumped { x: usize, y: usize },
    EnemyStomped { id: u32 },
    EnemyShot { id: u32 },
    ProjectileFired { id: u32 },
    LifeLost { lives_left: i32 },
    LevelStarted { index: usize },
    LevelComplete { index: usize, bonus: u64 },
    GameOver { score: u64 },
    GameComplete { score: u64 },
}

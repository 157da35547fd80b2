//! Events emitted during a session update.
//! The presentation layer consumes these for messages and effects.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LootKind {
    Gold,
    Diamond,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SimEvent {
    SurvivalGold { amount: u32 },
    GoldPicked { x: usize, y: usize, amount: u32 },
    DiamondPicked { x: usize, y: usize, bonus: u32 },
    LootSpawned { x: usize, y: usize, kind: LootKind },
    RunnerCaught { chaser: usize, x: usize, y: usize },
}

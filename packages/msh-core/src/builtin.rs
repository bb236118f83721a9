//! The builtin hunting sequences, timings are tuned against the emulator and must stay exact.
//!
//! `soft_reset`, `run_away` and `bike_lap` are building blocks, the others are hunts: running
//! one to completion counts as one encounter on every emulator.

use msh_controller::{Button, Direction};

use crate::task::{Action, Task, TaskStep};

use Button::{Start, A, B, X, Y};
use Direction::{Down, Left, Right, Up};

fn press(button: Button, wait: f64) -> TaskStep {
    TaskStep::from_action(Action::press(button)).with_wait(wait)
}

fn tap(direction: Direction, wait: f64) -> TaskStep {
    TaskStep::from_action(Action::tilt(direction)).with_wait(wait)
}

fn hold(direction: Direction, sec: f64) -> TaskStep {
    TaskStep::from_action(Action::hold(direction, sec))
}

fn task(name: &str, wait: f64) -> TaskStep {
    TaskStep::from_action(Action::by_name(name)).with_wait(wait)
}

fn call(name: &str) -> TaskStep {
    TaskStep::from_action(Action::by_name(name))
}

fn last(button: Button) -> TaskStep {
    TaskStep::from_action(Action::press(button))
}

/// Every builtin task
pub fn tasks() -> Vec<Task> {
    vec![
        soft_reset(),
        run_away(),
        bike_lap(),
        test_inputs(),
        eevee(),
        sudowoodo(),
        snorlax(),
        simple_reset(),
        primo_slugma_egg(),
        fossil(),
        run_away_hunt(),
        sweet_scent_setup(),
        sweet_scent(),
        headbutt(),
    ]
}

/// Reset every game and skip the title screens into the save file
pub fn soft_reset() -> Task {
    Task::from_steps(vec![
        TaskStep::from_action(Action::SoftReset).with_wait(8.5),
        press(Start, 1.75),
        press(Start, 3.0),
        press(A, 3.0),
        last(A),
    ])
    .with_name("soft_reset")
    .with_desc("soft reset every emulator and load the save")
}

/// Flee from the current wild battle
pub fn run_away() -> Task {
    Task::from_steps(vec![
        press(A, 0.05),
        tap(Down, 0.05),
        tap(Right, 0.05),
        press(A, 5.6),
    ])
    .with_name("run_away")
    .with_desc("flee from a wild battle")
}

/// One back and forth lap on the bike
pub fn bike_lap() -> Task {
    Task::from_steps(vec![hold(Left, 2.875), hold(Right, 2.875)])
        .with_name("bike_lap")
        .with_desc("ride left then right")
}

pub fn test_inputs() -> Task {
    Task::from_steps(vec![hold(Right, 4.0)])
        .with_name("test_inputs")
        .with_desc("hold right for 4 seconds")
}

pub fn eevee() -> Task {
    Task::from_steps(vec![
        task("soft_reset", 1.0),
        press(A, 1.0),
        press(A, 1.0),
        press(A, 1.0),
        press(A, 1.7),
        press(A, 0.5),
        press(A, 0.5),
        press(A, 6.0),
        press(B, 1.5),
        press(A, 0.5),
        last(A),
        TaskStep::from_action(Action::Summary { slot: 6 }),
    ])
    .with_name("eevee")
    .with_desc("receive the gift eevee and open its summary")
    .as_hunt()
}

pub fn sudowoodo() -> Task {
    Task::from_steps(vec![
        task("soft_reset", 3.5),
        press(A, 4.0),
        press(A, 3.0),
        press(A, 2.0),
        press(A, 3.5),
        press(A, 0.5),
        last(A),
    ])
    .with_name("sudowoodo")
    .with_desc("static sudowoodo encounter")
    .as_hunt()
}

pub fn snorlax() -> Task {
    Task::from_steps(vec![
        task("soft_reset", 3.5),
        press(A, 4.0),
        press(X, 0.1),
        tap(Up, 0.1),
        press(A, 1.0),
        press(B, 1.75),
        press(B, 0.1),
        press(A, 0.15),
        press(A, 0.4),
        last(A),
    ])
    .with_name("snorlax")
    .with_desc("wake snorlax with the poke flute")
    .as_hunt()
}

pub fn simple_reset() -> Task {
    Task::from_steps(vec![task("soft_reset", 0.15), last(A)])
        .with_name("simple_reset")
        .with_desc("soft reset and press A")
        .as_hunt()
}

pub fn primo_slugma_egg() -> Task {
    let mut steps = vec![
        task("soft_reset", 1.5),
        // talk to Primo
        press(A, 1.5),
        press(A, 1.5),
        press(A, 1.5),
        press(A, 2.0),
        press(A, 3.0),
        // first password: rock head work
        press(A, 1.5),
        tap(Down, 0.05),
        tap(Right, 0.05),
        press(A, 0.5),
        tap(Down, 0.1).times(44),
        press(A, 2.0),
        tap(Right, 0.05),
        press(A, 1.5),
        tap(Down, 0.05),
        tap(Down, 0.05),
        tap(Right, 0.05),
        tap(Right, 0.05),
        press(A, 0.5),
        tap(Right, 0.05),
        tap(Down, 0.1).times(50),
        press(A, 2.0),
        tap(Down, 0.05),
        press(A, 0.5),
        press(A, 3.0),
        press(A, 1.5),
        press(A, 1.5),
        press(A, 3.0),
        // second password: likes nice
        press(A, 1.5),
        tap(Down, 0.05).times(3),
        press(A, 0.5),
        tap(Right, 0.05),
        tap(Down, 0.1).times(12),
        press(A, 2.0),
        tap(Right, 0.05),
        press(A, 1.0),
        tap(Down, 0.05).times(3),
        press(A, 0.5),
        tap(Right, 0.05),
        tap(Down, 0.1).times(14),
        press(A, 2.0),
        tap(Down, 0.05),
        press(A, 0.5),
        press(A, 3.0),
        press(A, 1.5),
        press(A, 1.5),
        press(A, 1.5),
        press(A, 1.0),
        press(A, 6.0),
        press(A, 0.5),
        // walk to the bike path
        tap(Down, 0.1).times(8),
        tap(Left, 0.1).times(5),
        tap(Down, 0.1),
        tap(Down, 3.5),
        tap(Left, 0.1).times(4),
        TaskStep::from_action(Action::Wait(0.05)),
        tap(Up, 0.1).times(11),
        // bike until the egg hatches
        press(Y, 0.35),
        hold(Left, 2.75).with_wait(0.5),
        hold(Right, 2.925),
    ];
    steps.push(call("bike_lap").times(34));
    steps.push(last(A));
    Task::from_steps(steps)
        .with_name("primo_slugma_egg")
        .with_desc("get the slugma egg from Primo and hatch it on the bike")
        .as_hunt()
}

pub fn fossil() -> Task {
    Task::from_steps(vec![
        task("soft_reset", 0.5),
        press(A, 1.0),
        press(A, 1.0),
        press(A, 6.0),
        press(B, 1.0),
        press(X, 0.1),
        tap(Down, 0.1),
        press(A, 1.25),
        tap(Right, 0.1),
        press(A, 0.25),
        last(A),
    ])
    .with_name("fossil")
    .with_desc("revive a fossil and open its summary")
    .as_hunt()
}

pub fn run_away_hunt() -> Task {
    Task::from_steps(vec![call("run_away"), last(A)])
        .with_name("run_away_hunt")
        .with_desc("flee and start the next wild battle")
        .as_hunt()
}

pub fn sweet_scent_setup() -> Task {
    Task::from_steps(vec![
        task("soft_reset", 3.5),
        press(A, 4.0),
        press(X, 0.1),
        tap(Down, 0.1),
        press(A, 1.25),
        tap(Down, 0.1),
        press(A, 0.1),
        tap(Left, 0.1),
        last(A),
    ])
    .with_name("sweet_scent_setup")
    .with_desc("reset and use sweet scent from the party menu")
    .as_hunt()
}

pub fn sweet_scent() -> Task {
    Task::from_steps(vec![
        call("run_away"),
        press(X, 0.1),
        press(A, 1.25),
        tap(Down, 0.1),
        press(A, 0.1),
        tap(Left, 0.1),
        last(A),
    ])
    .with_name("sweet_scent")
    .with_desc("flee and use sweet scent again")
    .as_hunt()
}

pub fn headbutt() -> Task {
    Task::from_steps(vec![
        call("run_away"),
        press(A, 1.4),
        press(A, 1.0),
        last(A),
    ])
    .with_name("headbutt")
    .with_desc("flee and headbutt the tree again")
    .as_hunt()
}

//! Benchmark of the controller tick.
//!
//! The tick must stay far below the 100–250 ms budget; this measures the
//! steady-state cost in idle and charging states against the simulated
//! board.

use criterion::{Criterion, criterion_group, criterion_main};

use evse_controller::config::EvseConfig;
use evse_controller::controller::EvseController;
use evse_controller::sim::{DummyMeter, SimBoard};

fn config() -> EvseConfig {
    let mut config = EvseConfig::default();
    config.pilot.debounce_ticks = 1;
    config
}

fn bench_process(c: &mut Criterion) {
    c.bench_function("process_idle", |b| {
        let mut controller =
            EvseController::new(config(), SimBoard::default(), DummyMeter::new(230, false))
                .unwrap();
        controller.process();
        b.iter(|| controller.process());
    });

    c.bench_function("process_charging", |b| {
        let mut controller =
            EvseController::new(config(), SimBoard::default(), DummyMeter::new(230, false))
                .unwrap();
        controller.board_mut().set_cp_millivolts(8_800);
        controller.process();
        controller.process();
        controller.board_mut().set_cp_millivolts(5_800);
        controller.process();
        b.iter(|| controller.process());
    });
}

criterion_group!(benches, bench_process);
criterion_main!(benches);

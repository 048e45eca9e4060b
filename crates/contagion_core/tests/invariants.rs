use contagion_core::{Compartment, SeirModel, SirModel};
use proptest::prelude::*;

fn grid(end: f64, n: usize) -> Vec<f64> {
    (0..=n).map(|k| end * k as f64 / n as f64).collect()
}

fn sir_inputs() -> impl Strategy<Value = (f64, f64, [f64; 3])> {
    (0.0..2.0f64, 0.0..1.0f64, 0.0..1.0f64, 0.0..0.2f64, 0.0..0.5f64)
        .prop_map(|(beta, gamma, s, i, r)| (beta, gamma, [s, i, r]))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn sir_conserves_population_and_stays_non_negative((beta, gamma, state) in sir_inputs()) {
        let mut model = SirModel::sir(beta, gamma, state).expect("valid model");
        model.simulate(&grid(60.0, 60)).expect("simulate");
        let n = model.population();
        let trajectory = model.trajectory().expect("stored");

        for (total, row) in trajectory.totals().into_iter().zip(trajectory.states()) {
            prop_assert!((total - n).abs() <= 1e-9 * n.max(1.0), "total {} vs {}", total, n);
            for &value in row {
                prop_assert!(value >= -1e-9, "negative compartment {}", value);
            }
        }
    }

    #[test]
    fn sir_infections_never_grow_below_threshold((beta, gamma, state) in sir_inputs()) {
        prop_assume!(beta > 0.0);
        let mut model = SirModel::sir(beta, gamma, state).expect("valid model");
        model.simulate(&grid(40.0, 80)).expect("simulate");
        let threshold = model.epidemic_threshold();
        let series = model.time_series().expect("series");
        let s = series.susceptible().expect("S");
        let i = series.infected().expect("I");

        for k in 0..s.len() - 1 {
            if s[k] <= threshold {
                prop_assert!(i[k + 1] <= i[k] + 1e-7, "I rose at sample {}", k);
            }
        }
    }

    #[test]
    fn seir_conserves_population(
        beta in 0.0..2.0f64,
        sigma in 0.0..1.0f64,
        gamma in 0.0..1.0f64,
        exposed in 0.0..0.1f64,
        infected in 0.0..0.1f64,
    ) {
        let state = [1.0 - exposed - infected, exposed, infected, 0.0];
        let mut model = SeirModel::seir(beta, sigma, gamma, state).expect("valid model");
        model.simulate(&grid(50.0, 50)).expect("simulate");
        for total in model.trajectory().expect("stored").totals() {
            prop_assert!((total - 1.0).abs() <= 1e-9);
        }
        let exposed_series = model.time_series().expect("series");
        prop_assert!(exposed_series.get(Compartment::Exposed).is_some());
    }

    #[test]
    fn final_size_stays_within_susceptible_pool((beta, gamma, state) in sir_inputs()) {
        let model = SirModel::sir(beta, gamma, state).expect("valid model");
        let final_size = model.final_size().expect("SIR always has a closed form");
        prop_assert!(final_size.susceptible >= 0.0);
        prop_assert!(final_size.susceptible <= state[0]);
        prop_assert!((0.0..=1.0).contains(&final_size.attack_rate));
    }
}

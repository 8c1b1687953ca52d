// tests/pricing_test.rs
use chrono::{Days, NaiveDate};
use rainbow_mc::analytics::bs_analytic;
use rainbow_mc::market::Asset;
use rainbow_mc::math_utils::{annualized_vol, TRADING_DAYS_PER_YEAR};
use rainbow_mc::mc::payoffs::{OptionKind, SelectionRule};
use rainbow_mc::mc::pricer::{
    price, price_detailed, PricingConfig, RainbowOption, StartDateBasis,
};
use rainbow_mc::mc::CancellationToken;
use rainbow_mc::rng::{get_normal_draw, seed_rng_from_u64};
use rainbow_mc::stats::estimate_model;
use rainbow_mc::PricingError;

fn first_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
}

/// One asset whose log-returns alternate +a/-a: sample mean exactly zero and
/// sample volatility a * sqrt(n/(n-1)), with the last close back at `s0`.
fn alternating_asset(ticker: &str, s0: f64, a: f64, returns: usize) -> Asset {
    assert!(returns % 2 == 0, "even count keeps the mean at zero");
    let mut asset = Asset::new(ticker);
    let mut price = s0;
    asset.insert(first_date(), price);
    for k in 0..returns {
        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
        price *= (sign * a).exp();
        asset.insert(first_date() + Days::new(1 + k as u64), price);
    }
    asset
}

/// Three assets with a shared driver, for multi-underlying scenarios.
fn correlated_market(days: u64) -> Vec<Asset> {
    let mut rng = seed_rng_from_u64(99);
    let mut prices = [100.0, 95.0, 105.0];
    let mut assets = vec![Asset::new("AAA"), Asset::new("BBB"), Asset::new("CCC")];
    for k in 0..days {
        let date = first_date() + Days::new(k);
        let common = get_normal_draw(&mut rng);
        for i in 0..3 {
            let idio = get_normal_draw(&mut rng);
            prices[i] *= (0.011 * (0.6 * common + 0.4 * idio)).exp();
            assets[i].insert(date, prices[i]);
        }
    }
    assets
}

#[test]
fn test_single_underlying_converges_to_black_scholes() {
    // With one underlying, Best-Of and Worst-Of coincide and the engine must
    // converge to the closed form. Zero rate makes the discounting convention
    // drop out of the comparison.
    let returns = 252;
    let asset = alternating_asset("SOLO", 100.0, 0.0126, returns);
    let pricing_date = first_date() + Days::new(returns as u64);
    let steps = 126u64;

    let model = estimate_model(&[asset.clone()], pricing_date).unwrap();
    let sigma_annual = annualized_vol(model.volatilities[0]);
    let t_eff = steps as f64 / TRADING_DAYS_PER_YEAR;
    let analytic = bs_analytic::bs_call_price(100.0, 100.0, 0.0, sigma_annual, t_eff);

    let option = RainbowOption::new(
        vec![asset],
        100.0,
        pricing_date,
        pricing_date + Days::new(steps),
        OptionKind::Call,
        SelectionRule::BestOf,
        0.0,
    )
    .unwrap();

    let cfg = PricingConfig {
        num_paths: 100_000,
        seed: 42,
        ..Default::default()
    };
    let detail = price_detailed(&option, &cfg, &CancellationToken::new()).unwrap();

    let abs_error = (detail.price - analytic).abs();
    println!("MC price: {}", detail.price);
    println!("Analytic price: {}", analytic);
    println!("Std error: {}", detail.std_error);
    println!("Absolute error: {}", abs_error);

    assert_eq!(detail.start_basis, StartDateBasis::CommonHistory);
    assert_eq!(detail.steps, steps as usize);
    assert!(
        abs_error < 4.0 * detail.std_error + 1e-6,
        "MC price {} not within 4 std errors ({}) of analytic {}",
        detail.price,
        detail.std_error,
        analytic
    );
}

#[test]
fn test_price_is_non_negative_across_contracts() {
    let assets = correlated_market(250);
    let pricing_date = first_date() + Days::new(249);
    let cancel = CancellationToken::new();
    let cfg = PricingConfig {
        num_paths: 4_000,
        seed: 7,
        ..Default::default()
    };

    for kind in [OptionKind::Call, OptionKind::Put] {
        for rule in [SelectionRule::BestOf, SelectionRule::WorstOf] {
            let option = RainbowOption::new(
                assets.clone(),
                100.0,
                pricing_date,
                pricing_date + Days::new(120),
                kind,
                rule,
                0.03,
            )
            .unwrap();
            let value = price(&option, &cfg, &cancel).unwrap();
            println!("{:?}/{:?}: {}", kind, rule, value);
            assert!(value >= 0.0, "{:?}/{:?} priced negative: {}", kind, rule, value);
        }
    }
}

#[test]
fn test_worst_of_call_never_above_best_of_call() {
    // Per path the worst selection pays at most the best selection, so the
    // ordering must survive averaging when both runs share a seed.
    let assets = correlated_market(250);
    let pricing_date = first_date() + Days::new(249);
    let cancel = CancellationToken::new();
    let cfg = PricingConfig {
        num_paths: 8_000,
        seed: 21,
        ..Default::default()
    };

    let build = |rule| {
        RainbowOption::new(
            assets.clone(),
            100.0,
            pricing_date,
            pricing_date + Days::new(180),
            OptionKind::Call,
            rule,
            0.02,
        )
        .unwrap()
    };

    let best = price(&build(SelectionRule::BestOf), &cfg, &cancel).unwrap();
    let worst = price(&build(SelectionRule::WorstOf), &cfg, &cancel).unwrap();
    println!("best-of: {}, worst-of: {}", best, worst);
    assert!(worst <= best);
}

#[test]
fn test_price_stabilizes_as_paths_grow() {
    let asset = alternating_asset("SOLO", 100.0, 0.011, 252);
    let pricing_date = first_date() + Days::new(252);
    let option = RainbowOption::new(
        vec![asset],
        100.0,
        pricing_date,
        pricing_date + Days::new(91),
        OptionKind::Call,
        SelectionRule::BestOf,
        0.01,
    )
    .unwrap();
    let cancel = CancellationToken::new();

    let run = |num_paths| {
        let cfg = PricingConfig {
            num_paths,
            seed: 4242,
            ..Default::default()
        };
        price_detailed(&option, &cfg, &cancel).unwrap()
    };

    let coarse = run(4_000);
    let fine = run(64_000);

    println!(
        "4k paths: {} +- {}, 64k paths: {} +- {}",
        coarse.price, coarse.std_error, fine.price, fine.std_error
    );

    // Standard error shrinks like 1/sqrt(n)...
    assert!(fine.std_error < coarse.std_error);
    // ...and the estimates agree within their combined uncertainty.
    let gap = (coarse.price - fine.price).abs();
    assert!(
        gap <= 4.0 * (coarse.std_error + fine.std_error),
        "gap {} exceeds combined tolerance",
        gap
    );
}

#[test]
fn test_stale_snapshot_branch_is_reported() {
    let assets = correlated_market(120);
    // Histories end well before this pricing date.
    let pricing_date = first_date() + Days::new(200);
    let option = RainbowOption::new(
        assets,
        100.0,
        pricing_date,
        pricing_date + Days::new(120),
        OptionKind::Call,
        SelectionRule::WorstOf,
        0.02,
    )
    .unwrap();

    let cfg = PricingConfig {
        num_paths: 2_000,
        seed: 5,
        ..Default::default()
    };
    let detail = price_detailed(&option, &cfg, &CancellationToken::new()).unwrap();

    assert_eq!(detail.start_basis, StartDateBasis::StaleHistory);
    assert_eq!(detail.start_date, first_date() + Days::new(119));
    // Horizon counts from the snapshot, not the pricing date.
    assert_eq!(
        detail.steps as i64,
        (option.maturity_date() - detail.start_date).num_days()
    );
}

#[test]
fn test_maturity_before_pricing_fails() {
    let assets = correlated_market(100);
    let pricing_date = first_date() + Days::new(99);

    for maturity in [pricing_date, pricing_date - Days::new(30)] {
        let option = RainbowOption::new(
            assets.clone(),
            100.0,
            pricing_date,
            maturity,
            OptionKind::Put,
            SelectionRule::WorstOf,
            0.02,
        )
        .unwrap();
        match price(&option, &PricingConfig::default(), &CancellationToken::new()) {
            Err(PricingError::InvalidMaturity { .. }) => {}
            other => panic!("expected InvalidMaturity, got {:?}", other),
        }
    }
}

#[test]
fn test_deadline_token_cancels_pricing() {
    let assets = correlated_market(250);
    let pricing_date = first_date() + Days::new(249);
    let option = RainbowOption::new(
        assets,
        100.0,
        pricing_date,
        pricing_date + Days::new(365),
        OptionKind::Call,
        SelectionRule::BestOf,
        0.02,
    )
    .unwrap();

    let cfg = PricingConfig {
        num_paths: 200_000,
        ..Default::default()
    };
    let cancel = CancellationToken::with_deadline(std::time::Duration::from_secs(0));
    match price(&option, &cfg, &cancel) {
        Err(PricingError::Cancelled { .. }) => {}
        other => panic!("expected Cancelled, got {:?}", other),
    }
}

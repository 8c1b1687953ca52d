// demos/demo.rs
//! End-to-end walkthrough: build a market, describe a rainbow option, price
//! it, and compare both Delta estimators.
//!
//! Histories are synthetic (seeded correlated GBM) since data acquisition is
//! out of scope for the engine.

use chrono::{Days, NaiveDate};
use rainbow_mc::market::{Asset, Market};
use rainbow_mc::math_utils::Timer;
use rainbow_mc::mc::greeks::{delta, DeltaMethod};
use rainbow_mc::mc::payoffs::{OptionKind, SelectionRule};
use rainbow_mc::mc::pricer::{price_detailed, PricingConfig, RainbowOption};
use rainbow_mc::mc::simulator::{simulate_paths, GbmParams, RecordMode};
use rainbow_mc::mc::CancellationToken;
use rainbow_mc::rng::{get_normal_draw, seed_rng_from_u64};
use rainbow_mc::stats::estimate_model;

const TICKERS: [&str; 3] = ["AAPL", "MSFT", "GOOG"];

fn synthetic_market(days: u64, seed: u64) -> Market {
    let first = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let mut rng = seed_rng_from_u64(seed);
    let mut prices = [185.0, 370.0, 140.0];
    let vols = [0.012, 0.010, 0.014];

    let mut market = Market::new();
    let mut assets: Vec<Asset> = TICKERS.iter().map(|t| Asset::new(*t)).collect();

    for k in 0..days {
        let date = first + Days::new(k);
        let common = get_normal_draw(&mut rng);
        for i in 0..3 {
            let idio = get_normal_draw(&mut rng);
            let shock = 0.6 * common + 0.8 * idio;
            prices[i] *= (vols[i] * shock).exp();
            assets[i].insert(date, prices[i]);
        }
    }
    for asset in assets {
        market.add(asset);
    }
    market
}

fn main() {
    println!("rainbow-mc demo ({} CPU cores)\n", num_cpus::get());

    let market = synthetic_market(504, 20240102);
    let mut underlyings = Vec::new();
    for ticker in TICKERS {
        let asset = market
            .get_historical_series(ticker)
            .expect("synthetic market is fully populated");
        let (last_date, last_close) = asset.last_observation().expect("history is non-empty");
        println!(
            "Ticker: {}, data points: {}, last close: {:.2} ({})",
            ticker,
            asset.len(),
            last_close,
            last_date
        );
        underlyings.push(asset.clone());
    }

    let pricing_date = underlyings[0].last_observation().unwrap().0;
    let maturity_date = pricing_date + Days::new(365);
    let cancel = CancellationToken::new();
    let cfg = PricingConfig {
        num_paths: 50_000,
        seed: 42,
        ..Default::default()
    };

    let best_of_call = RainbowOption::new(
        underlyings.clone(),
        400.0,
        pricing_date,
        maturity_date,
        OptionKind::Call,
        SelectionRule::BestOf,
        0.02,
    )
    .expect("valid contract");

    println!(
        "\nBest-Of CALL | strike {:.2} | maturity {:.2}y | {} paths",
        best_of_call.strike(),
        best_of_call.time_to_maturity(),
        cfg.num_paths
    );

    let mut timer = Timer::new();
    let detail = price_detailed(&best_of_call, &cfg, &cancel).expect("pricing succeeds");
    println!(
        "price = {:.4} +- {:.4} (start {} via {:?}, {} steps, {:.0} ms)",
        detail.price,
        detail.std_error,
        detail.start_date,
        detail.start_basis,
        detail.steps,
        timer.elapsed_ms()
    );

    let worst_of_put = RainbowOption::new(
        underlyings,
        300.0,
        pricing_date,
        maturity_date,
        OptionKind::Put,
        SelectionRule::WorstOf,
        0.02,
    )
    .expect("valid contract");

    timer.start();
    let put_detail = price_detailed(&worst_of_put, &cfg, &cancel).expect("pricing succeeds");
    println!(
        "\nWorst-Of PUT | strike {:.2} | price = {:.4} +- {:.4} ({:.0} ms)",
        worst_of_put.strike(),
        put_detail.price,
        put_detail.std_error,
        timer.elapsed_ms()
    );

    // Delta two ways: 2n repricings vs one reused batch.
    let greeks_cfg = PricingConfig {
        num_paths: 20_000,
        seed: 42,
        ..Default::default()
    };

    timer.start();
    let fd = delta(
        &best_of_call,
        DeltaMethod::FiniteDifference { bump: 0.01 },
        &greeks_cfg,
        &cancel,
    )
    .expect("finite-difference delta");
    let fd_ms = timer.elapsed_ms();

    timer.start();
    let pw = delta(&best_of_call, DeltaMethod::Pathwise, &greeks_cfg, &cancel)
        .expect("pathwise delta");
    let pw_ms = timer.elapsed_ms();

    println!("\nDelta (Best-Of CALL):");
    println!("  {:<8} {:>12} {:>12}", "ticker", "finite-diff", "pathwise");
    for (i, ticker) in TICKERS.iter().enumerate() {
        println!("  {:<8} {:>12.4} {:>12.4}", ticker, fd[i], pw[i]);
    }
    println!(
        "  finite-diff took {:.0} ms (2n repricings), pathwise {:.0} ms (one batch)",
        fd_ms, pw_ms
    );

    // Full-path recording: first ten days of the first simulated path.
    let model = estimate_model(best_of_call.underlyings(), pricing_date)
        .expect("calibration succeeds");
    let params = GbmParams {
        spots: best_of_call
            .underlyings()
            .iter()
            .map(|a| a.last_observation().unwrap().1)
            .collect(),
        drifts: model.mean_returns.iter().copied().collect(),
        vols: model.volatilities.iter().copied().collect(),
        cholesky: model.cholesky.clone(),
    };
    let batch = simulate_paths(&params, 10, 5, 7, RecordMode::FullPaths, &cancel)
        .expect("tiny batch simulates");
    let paths = batch.full_paths().expect("full paths were recorded");

    println!("\nFirst path, first 10 days (historical drift):");
    for (i, ticker) in TICKERS.iter().enumerate() {
        let row: Vec<String> = (0..=10).map(|d| format!("{:.1}", paths[i][(0, d)])).collect();
        println!("  {:<8} {}", ticker, row.join(" "));
    }
}

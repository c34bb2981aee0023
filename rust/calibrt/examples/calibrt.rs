use calibrt::{
    DiagnosticReport,
    Point,
    fit_with_diagnostics,
};

fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn main() {
    println!("Running RT calibration example");
    setup_tracing();

    // 1. Generate some iRT peptides along iRT = 1.8 * rt - 40 with a little jitter
    let points: Vec<Point> = (0..11)
        .map(|i| {
            let x = 20.0 + i as f64 * 6.5;
            let jitter = if i % 2 == 0 { 0.4 } else { -0.3 };
            Point {
                x,
                y: 1.8 * x - 40.0 + jitter,
            }
        })
        .collect();

    println!("Generated {} reference points.", points.len());

    // 2. Fit the run, writing one page of diagnostics
    let mut report = match DiagnosticReport::create("rtcalibration_example.pdf") {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Unable to create report: {}", e);
            return;
        }
    };

    match fit_with_diagnostics("example_run", &points, &mut report) {
        Ok(cal) => {
            println!("Calibration successful!");
            println!("Calibrator: {:#?}", cal);
            println!("\n--- Predictions ---");
            for rt in [20.0, 45.5, 80.0] {
                println!("- RT {:.2} -> iRT {:.2}", rt, cal.predict(rt));
            }
        }
        Err(e) => eprintln!("Calibration failed: {}", e),
    }

    // Example with a single point
    println!("\n--- Testing error case (one point) ---");
    match fit_with_diagnostics("lonely_run", &points[..1], &mut report) {
        Ok(_) => println!("This should have failed!"),
        Err(e) => eprintln!("Correctly failed with error: {}", e),
    }

    match report.close() {
        Ok(n) => println!("Wrote {} page(s) to rtcalibration_example.pdf", n),
        Err(e) => eprintln!("Failed to close report: {}", e),
    }
}

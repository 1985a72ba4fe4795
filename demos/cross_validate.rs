//! Cross-validate a build method on one or more delimited data files.
//!
//! cargo run --release --example cross_validate -- <method> <file>...
use classifier_builder::config::{BuildMethod, TreeConfig};
use classifier_builder::cross_validation::CrossValidation;
use classifier_builder::persist::save_fold_results;
use classifier_builder::progress::CrossValidationProgress;
use classifier_builder::reader::DataSetReader;
use std::env;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("usage: cross_validate <C45|DE|HCF|HCB|HCR|Cavity|CavityC45> <file>...");
        return Ok(());
    }
    let method: BuildMethod = args[0].parse()?;
    let cfg = TreeConfig::new(method).set_seed(42);

    for file in &args[1..] {
        let data = match DataSetReader::new().file(file).read() {
            Ok(d) => d,
            Err(e) => {
                eprintln!("{}: {}", file, e);
                continue;
            }
        };
        let progress = CrossValidationProgress::new(cfg.folds);
        let result = match CrossValidation::new(&data, cfg.clone()).run(Some(&progress)) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("{}: {}", file, e);
                continue;
            }
        };
        let (_, seconds) = progress.snapshot();
        let mean_f = result
            .folds
            .iter()
            .map(|f| f.confusion.macro_f_measure())
            .sum::<f64>()
            / result.folds.len() as f64;
        println!(
            "{} {}: accuracy {:.4}, mean macro F {:.4}, mean tree size {:.1} ({:.1}s)",
            file,
            method,
            result.accuracy(),
            mean_f,
            result.mean_tree_size(),
            seconds
        );
        print!("{}", result.confusion);

        let out = format!("{}.{}.folds.json", file, method);
        if let Err(e) = save_fold_results(&result.folds, &out) {
            eprintln!("{}: {}", out, e);
        }
    }
    Ok(())
}

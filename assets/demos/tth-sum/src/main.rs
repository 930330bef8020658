use std::process::ExitCode;

use adc_codec::hash::tth;

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);

    let (Some(file), None) = (args.next(), args.next()) else {
        eprintln!("USAGE: tth-sum <file>");
        return ExitCode::from(1);
    };

    match tth::tth_of_file(&file) {
        Ok(tree) => {
            println!("{} {file}", tth::format_root(&tree));
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("tth-sum: {file}: {error}");
            ExitCode::from(2)
        }
    }
}

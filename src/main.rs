use diffman::run;

fn main() {
    if let Err(error) = run() {
        eprintln!("diffman failed: {error}");
        std::process::exit(1);
    }
}

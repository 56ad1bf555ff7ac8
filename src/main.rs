fn main() {
    if let Err(err) = sheet_intake::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    compass::cli::main()
}

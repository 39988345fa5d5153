use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    bugsplit::apps::run_cli(std::env::args().skip(1))
}

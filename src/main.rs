use std::io::{self, BufRead};

use calcline::{Evaluator, SymbolTable, Value};

fn main() -> io::Result<()> {
    pretty_env_logger::init();

    let symbols = SymbolTable::new();
    let mut evaluator = Evaluator::new(&symbols);

    for line in io::stdin().lock().lines() {
        let line = line?;
        match evaluator.evaluate(&line) {
            Ok(Value::Real(result)) => println!("= {result:.6}"),
            Ok(Value::Void) => {}
            Err(err) => {
                // caret under the offending column of the echoed input
                println!("{:width$}^", "", width = err.offset);
                println!("ERROR: {err}");
            }
        }
    }

    Ok(())
}

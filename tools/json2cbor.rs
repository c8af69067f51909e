/*!
json2cbor - convert JSON to CBOR binary

Reads JSON from a file or stdin into a dynamic value and writes its CBOR
encoding to a file or stdout.

```bash
json2cbor -i data.json -o data.cbor
echo '{"name": "Alice", "age": 30}' | json2cbor > data.cbor
```
*/

use clap::Parser;
use std::fs::File;
use std::io::{self, Write};
use strand_cbor::encode::Encoder;
use strand_cbor::Value;

/// Convert JSON to CBOR binary
#[derive(Parser, Debug)]
#[command(author, version, about = "Convert JSON to CBOR binary")]
struct Cli {
    /// Input JSON file (use '-' for stdin)
    #[arg(short = 'i', long, default_value = "-")]
    input: String,

    /// Output CBOR file (use '-' for stdout)
    #[arg(short = 'o', long, default_value = "-")]
    output: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let json: serde_json::Value = match cli.input.as_str() {
        "-" => serde_json::from_reader(io::stdin().lock())?,
        path => serde_json::from_reader(File::open(path)?)?,
    };
    let value = json_to_value(json);

    let out: Box<dyn Write> = match cli.output.as_str() {
        "-" => Box::new(io::stdout().lock()),
        path => Box::new(File::create(path)?),
    };
    let mut enc = Encoder::new(out);
    enc.encode(&value)?;
    enc.flush()?;

    Ok(())
}

fn json_to_value(json: serde_json::Value) -> Value {
    use serde_json::Value as J;

    match json {
        J::Null => Value::Null,
        J::Bool(b) => Value::Bool(b),
        J::Number(n) => {
            if let Some(u) = n.as_u64() {
                Value::Uint(u)
            } else if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        J::String(s) => Value::Text(s),
        J::Array(items) => Value::Array(items.into_iter().map(json_to_value).collect()),
        J::Object(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (Value::Text(k), json_to_value(v)))
                .collect(),
        ),
    }
}

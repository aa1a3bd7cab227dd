use std::path::Path;

use trace_for_guess::readers;
use trace_for_guess::utils::field_statistics;

fn main() {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "./data/cru_tmp.tif".to_string());
    let reader = readers::create_reader(Path::new(&path), "tmp").unwrap();

    let field = reader.read_data().unwrap();
    println!("{} [{}] {}", field.variable_name(), field.units(), field.shape());
    if let Some(stats) = field_statistics(&field) {
        println!("{stats:?}");
    }
}

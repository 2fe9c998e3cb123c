use deepdump_derive::ToPyValue;

#[derive(ToPyValue)]
enum Shape {
    Circle { radius: f64 },
    Square { side: f64 },
}

fn main() {}

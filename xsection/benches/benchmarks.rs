use criterion::{criterion_group, criterion_main, Criterion};
use geo::{coord, line_string};
use tin::{fixtures::grid, Attribute, TriangleId};
use xsection::{Absorption, Attributes, Building, CrossSection, GroundType, ReflectionFinder};

fn cross_section(c: &mut Criterion) {
    let mut group = c.benchmark_group("Cross Section");

    let mesh = grid(
        200,
        200,
        5.0,
        |x, y| (x * 0.01).sin() * 3.0 + (y * 0.02).cos() * 2.0,
        |i, j| match (i, j) {
            (60..=70, 80..=140) => Attribute::Building(1),
            _ if (i / 10 + j / 10) % 2 == 0 => Attribute::Ground(0),
            _ => Attribute::Ground(1),
        },
    )
    .unwrap();
    let attributes = Attributes::new(
        [Building::new(
            1,
            line_string![
                (x: 300.0, y: 400.0),
                (x: 355.0, y: 400.0),
                (x: 355.0, y: 705.0),
                (x: 300.0, y: 705.0),
            ],
            0.0,
            18.0,
        )],
        [
            GroundType::new(0, Absorption::Reflective),
            GroundType::new(1, Absorption::Absorptive),
        ],
    );

    let receiver = coord! { x: 12.5, y: 512.5 };
    let source = coord! { x: 987.5, y: 498.0 };
    let receiver_triangle = mesh.locate(TriangleId(0), receiver).unwrap();
    let builder = CrossSection::builder()
        .receiver(receiver)
        .receiver_triangle(receiver_triangle)
        .source(source);

    group.bench_with_input("direct", &builder, |b, builder| {
        b.iter(|| builder.build(&mesh, &attributes).unwrap())
    });

    let finder = ReflectionFinder::new();
    let near = coord! { x: 200.0, y: 300.0 };
    let far = coord! { x: 250.0, y: 900.0 };
    group.bench_with_input("reflections", &finder, |b, finder| {
        b.iter(|| {
            finder
                .first_order(near, far, &[1], &mesh, &attributes)
                .unwrap()
        })
    });
}

criterion_group!(benches, cross_section);
criterion_main!(benches);

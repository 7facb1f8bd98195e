use std::collections::{BTreeSet, HashSet};

use geometry::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use test_log::test;

use crate::cell::DirtyFlags;
use crate::prelude::*;
use crate::spatial::IndexKey;

const LAYER: Layer = Layer::new(1, 0);

fn unit_box() -> Rect {
    Rect::from_sides(0, 0, 10, 10)
}

/// Scenario (2): `a` instances `b` translated by (100, 0).
fn translated_pair(layout: &mut Layout) -> (CellId, CellId) {
    let a = layout.create_cell("A").unwrap();
    let b = layout.create_cell("B").unwrap();
    layout.insert_shape(b, LAYER, unit_box()).unwrap();
    let placement = Placement::builder().offset(Point::new(100, 0)).build();
    layout.insert_instance(a, Instance::new(b, placement)).unwrap();
    (a, b)
}

#[test]
fn single_box_bbox() {
    let mut layout = Layout::new();
    let a = layout.create_cell("A").unwrap();
    layout.insert_shape(a, LAYER, unit_box()).unwrap();
    assert_eq!(layout.cell_bbox(a, LAYER), unit_box());
    assert_eq!(layout.cell_bbox(a, Layer::new(2, 0)), Rect::EMPTY);
}

#[test]
fn translated_instance_bbox() {
    let mut layout = Layout::new();
    let (a, _) = translated_pair(&mut layout);
    assert_eq!(layout.cell_bbox(a, LAYER), Rect::from_sides(100, 0, 110, 10));
}

#[test]
fn array_instance_bbox() {
    let mut layout = Layout::new();
    let a = layout.create_cell("A").unwrap();
    let b = layout.create_cell("B").unwrap();
    layout.insert_shape(b, LAYER, unit_box()).unwrap();
    let placement = Placement::builder()
        .offset(Point::new(100, 0))
        .repetition(Repetition::array(1, 3, Point::zero(), Point::new(50, 0)))
        .build();
    layout.insert_instance(a, Instance::new(b, placement)).unwrap();
    assert_eq!(layout.cell_bbox(a, LAYER), Rect::from_sides(100, 0, 210, 10));
}

#[test]
fn region_query_finds_the_instance() {
    let mut layout = Layout::new();
    let (a, b) = translated_pair(&mut layout);
    let option = CellUpdateOption {
        spatial_index: SpatialIndexOption {
            window_step: 5,
            ..Default::default()
        },
        ..Default::default()
    };
    layout
        .update_cell(a, UpdateFlags::SPATIAL_INDEX, &option)
        .unwrap();
    let index = layout.spatial_index(a, LAYER).unwrap();
    let region = Rect::from_sides(95, -5, 115, 15);

    let keys: Vec<_> = index
        .query(region, QueryMode::Accurate, QueryKind::All, None)
        .collect();
    assert_eq!(keys, vec![IndexKey::Instance(0)]);

    let elements: Vec<_> = CellElementIterator::new(
        &layout,
        a,
        LAYER,
        Some(region),
        QueryKind::All,
        QueryMode::Accurate,
    )
    .collect();
    assert_eq!(elements, vec![Element::instance(a, 0)]);

    let option = ElementIteratorOption {
        region: Some(region),
        query: QueryKind::Shapes,
        polygon_data: true,
        ..Default::default()
    };
    let visits: Vec<_> = ElementIterator::new(&layout, a, LAYER, option).collect();
    assert_eq!(visits.len(), 1);
    assert_eq!(visits[0].cell, b);
    assert_eq!(visits[0].level, 1);
    assert_eq!(
        visits[0].polygon_data(&layout),
        Polygon::from_rect(Rect::from_sides(100, 0, 110, 10))
            .points()
            .to_vec()
    );
}

#[test]
fn deleting_a_child_severs_links() {
    let mut layout = Layout::new();
    let (a, b) = translated_pair(&mut layout);
    assert!(layout.cell(b).has_parent(a));

    layout.delete_instances_of(a, b).unwrap();
    assert!(!layout.cell(b).has_parent(a));
    layout.delete_cell(b, DeleteMode::Shallow).unwrap();
    assert!(layout.cell(a).instances().iter().all(|i| i.cell() != b));
    assert_eq!(layout.cell_bbox(a, LAYER), Rect::EMPTY);

    let (c, d) = {
        let c = layout.create_cell("C").unwrap();
        let d = layout.create_cell("D").unwrap();
        layout.insert_shape(d, LAYER, unit_box()).unwrap();
        layout
            .insert_instance(c, Instance::new(d, Placement::default()))
            .unwrap();
        (c, d)
    };
    assert_eq!(layout.cell_bbox(c, LAYER), unit_box());
    layout.delete_cell(d, DeleteMode::Shallow).unwrap();
    assert!(layout.cell(c).instances().is_empty());
    assert_eq!(layout.cell_bbox(c, LAYER), Rect::EMPTY);
    assert_eq!(layout.max_level(c), 0);
}

#[test]
fn compress_then_decompress_keeps_shapes() {
    let mut layout = Layout::new();
    let cell = layout.create_cell("row").unwrap();
    let original: Vec<Rect> = (0..10_000)
        .map(|i| Rect::from_sides(i * 10, 0, i * 10 + 5, 5))
        .collect();
    layout.insert_shapes(cell, LAYER, original.clone()).unwrap();

    layout.compress(2);
    let shapes = layout.cell(cell).shapes(LAYER).unwrap();
    assert!(shapes.count(ShapeKind::Rect) < original.len());
    assert_eq!(shapes.polygon_count(), original.len());

    layout.decompress();
    let mut rects = layout.cell(cell).shapes(LAYER).unwrap().rects().to_vec();
    rects.sort();
    let mut expected = original;
    expected.sort();
    assert_eq!(rects, expected);
}

#[test]
fn compress_roundtrip_across_the_coordinate_range() {
    let mut layout = Layout::new();
    let pair = layout.create_cell("pair").unwrap();
    let row = layout.create_cell("row").unwrap();
    let pair_rects = vec![
        Rect::from_sides(-2_000_000_000, 0, -1_999_999_990, 10),
        Rect::from_sides(2_000_000_000, 0, 2_000_000_010, 10),
    ];
    let row_rects: Vec<Rect> = (-8..8)
        .map(|i| Rect::from_sides(250_000_000 * i, 0, 250_000_000 * i + 5, 5))
        .collect();
    layout.insert_shapes(pair, LAYER, pair_rects.clone()).unwrap();
    layout.insert_shapes(row, LAYER, row_rects.clone()).unwrap();

    for level in [1, 2] {
        layout.compress(level);
        layout.decompress();
        for (id, original) in [(pair, &pair_rects), (row, &row_rects)] {
            let mut rects = layout.cell(id).shapes(LAYER).unwrap().rects().to_vec();
            rects.sort();
            let mut expected = original.clone();
            expected.sort();
            assert_eq!(rects, expected);
        }
    }
}

/// The bounding box of `id` on `layer`, computed without any cache.
fn fresh_bbox(layout: &Layout, id: CellId, layer: Layer) -> Rect {
    let cell = layout.cell(id);
    let own = cell
        .shapes(layer)
        .map(|s| s.rects().iter().fold(Rect::EMPTY, |acc, r| acc.union(*r)))
        .unwrap_or_default();
    cell.instances().iter().fold(own, |acc, inst| {
        let child = fresh_bbox(layout, inst.cell(), layer);
        if child.is_empty() {
            return acc;
        }
        (0..inst.placement().len()).fold(acc, |acc, i| {
            acc.union(inst.placement().trans(i).apply_rect(child))
        })
    })
}

/// Returns `true` unless `id` holds a clean `flag` for `layer`.
fn dirty(layout: &Layout, id: CellId, layer: Layer, flag: DirtyFlags) -> bool {
    layout
        .cell(id)
        .cache()
        .entries
        .get(&layer)
        .is_none_or(|entry| entry.dirty.contains(flag))
}

fn check_consistency(layout: &Layout, layers: &[Layer]) {
    let ids: Vec<CellId> = layout.cells().map(|(id, _)| id).collect();
    for &id in &ids {
        let parents: HashSet<CellId> = layout.cell(id).parents().collect();
        let instancing: HashSet<CellId> = ids
            .iter()
            .copied()
            .filter(|&p| layout.cell(p).instances().iter().any(|i| i.cell() == id))
            .collect();
        assert_eq!(parents, instancing);

        if layout.cell(id).cache().layers_dirty {
            for parent in &parents {
                assert!(layout.cell(*parent).cache().layers_dirty);
            }
        }
        for &layer in layers {
            let has_entry = layout.cell(id).cache().entries.contains_key(&layer);
            for flag in [DirtyFlags::BBOX, DirtyFlags::SPATIAL_INDEX] {
                if has_entry && dirty(layout, id, layer, flag) {
                    for parent in &parents {
                        assert!(dirty(layout, *parent, layer, flag));
                    }
                }
            }
        }
    }
    for &id in &ids {
        for &layer in layers {
            assert_eq!(layout.cell_bbox(id, layer), fresh_bbox(layout, id, layer));
        }
    }
}

#[test]
fn random_edits_keep_caches_transparent() {
    let mut rng = StdRng::seed_from_u64(0x1a7d_b);
    let layers = [Layer::new(1, 0), Layer::new(2, 0), Layer::new(3, 0)];
    let mut layout = Layout::new();
    let mut names = 0;
    for _ in 0..8 {
        layout.create_cell(format!("cell{names}")).unwrap();
        names += 1;
    }

    for step in 0..400 {
        let ids: Vec<CellId> = layout.cells().map(|(id, _)| id).collect();
        let id = ids[rng.gen_range(0..ids.len())];
        let layer = layers[rng.gen_range(0..layers.len())];
        match rng.gen_range(0..10) {
            0..=2 => {
                let x = rng.gen_range(-100..100);
                let y = rng.gen_range(-100..100);
                let rect = Rect::from_sides(x, y, x + rng.gen_range(1..20), y + rng.gen_range(1..20));
                layout.insert_shape(id, layer, rect).unwrap();
            }
            3 => {
                let count = layout.cell(id).shapes(layer).map_or(0, |s| s.count(ShapeKind::Rect));
                if count > 0 {
                    let index = rng.gen_range(0..count) as u32;
                    layout.delete_shapes(id, layer, ShapeKind::Rect, &[index]).unwrap();
                }
            }
            4..=5 => {
                let child = ids[rng.gen_range(0..ids.len())];
                let placement = if rng.gen_bool(0.5) {
                    Placement::builder()
                        .offset(Point::new(rng.gen_range(-50..50), rng.gen_range(-50..50)))
                        .build()
                } else {
                    Placement::builder()
                        .offset(Point::new(rng.gen_range(-50..50), 0))
                        .repetition(Repetition::array(
                            rng.gen_range(1..3),
                            rng.gen_range(1..4),
                            Point::new(0, 30),
                            Point::new(40, 0),
                        ))
                        .build()
                };
                let result = layout.insert_instance(id, Instance::new(child, placement));
                assert_eq!(result.is_err(), layout.is_ancestor_or_self(child, id));
            }
            6 => {
                let count = layout.cell(id).instances().len();
                if count > 0 {
                    let index = rng.gen_range(0..count) as u32;
                    layout.delete_instances(id, &[index]).unwrap();
                }
            }
            7 => {
                if rng.gen_bool(0.5) {
                    layout.cell_bbox(id, layer);
                } else {
                    let option = CellUpdateOption {
                        spatial_index: SpatialIndexOption {
                            window_step: 25,
                            ..Default::default()
                        },
                        ..Default::default()
                    };
                    layout
                        .update_cell(id, UpdateFlags::SPATIAL_INDEX, &option)
                        .unwrap();
                }
                if rng.gen_bool(0.3) {
                    layout.layers_including_children(id);
                }
            }
            8 => {
                if step % 5 == 0 {
                    let mode = if rng.gen_bool(0.5) {
                        DeleteMode::Shallow
                    } else {
                        DeleteMode::Deep
                    };
                    layout.delete_cell(id, mode).unwrap();
                    if layout.is_empty() {
                        layout.create_cell(format!("cell{names}")).unwrap();
                        names += 1;
                    }
                } else {
                    layout.create_cell(format!("cell{names}")).unwrap();
                    names += 1;
                }
            }
            _ => {
                let dx = rng.gen_range(-20..20);
                layout
                    .transform_cell(id, &Transformation::from_offset(Point::new(dx, 0)))
                    .unwrap();
            }
        }
        check_consistency(&layout, &layers);
    }
}

/// Every rectangle below `id` touching `region`, with the offset of its cell.
fn naive_walk(
    layout: &Layout,
    id: CellId,
    layer: Layer,
    trans: Transformation,
    region: Rect,
    out: &mut BTreeSet<(Element, Point)>,
) {
    let cell = layout.cell(id);
    if let Some(shapes) = cell.shapes(layer) {
        for (i, rect) in shapes.rects().iter().enumerate() {
            if trans.apply_rect(*rect).intersects(&region) {
                let element = Element::shape(
                    ShapeKind::Rect,
                    ShapeRef {
                        cell: id,
                        layer,
                        index: i as u32,
                    },
                );
                out.insert((element, trans.offset_point()));
            }
        }
    }
    for inst in cell.instances() {
        for i in 0..inst.placement().len() {
            let trans = Transformation::cascade(trans, inst.placement().trans(i));
            naive_walk(layout, inst.cell(), layer, trans, region, out);
        }
    }
}

fn random_hierarchy(rng: &mut StdRng) -> (Layout, CellId) {
    let mut layout = Layout::new();
    let ids: Vec<CellId> = (0..6)
        .map(|i| layout.create_cell(format!("c{i}")).unwrap())
        .collect();
    for (n, &id) in ids.iter().enumerate() {
        for _ in 0..rng.gen_range(0..40) {
            let x = rng.gen_range(0..200);
            let y = rng.gen_range(0..200);
            layout
                .insert_shape(id, LAYER, Rect::from_sides(x, y, x + 8, y + 8))
                .unwrap();
        }
        if n + 1 == ids.len() {
            continue;
        }
        for _ in 0..rng.gen_range(1..4) {
            let child = ids[rng.gen_range(n + 1..ids.len())];
            let mut builder = Placement::builder();
            builder.offset(Point::new(rng.gen_range(-300..300), rng.gen_range(-300..300)));
            if rng.gen_bool(0.5) {
                builder.repetition(Repetition::array(
                    rng.gen_range(1..4),
                    rng.gen_range(1..5),
                    Point::new(0, 230),
                    Point::new(250, 0),
                ));
            }
            layout
                .insert_instance(id, Instance::new(child, builder.build()))
                .unwrap();
        }
    }
    (layout, ids[0])
}

#[test]
fn pruned_traversal_matches_naive_walk() {
    let mut rng = StdRng::seed_from_u64(7);
    for round in 0..6 {
        let (mut layout, top) = random_hierarchy(&mut rng);
        if round % 2 == 1 {
            let option = LayoutUpdateOption {
                threads: 2,
                window_step: 100,
            };
            layout.update(UpdateFlags::all(), &option).unwrap();
        }
        let bbox = layout.cell_bbox(top, LAYER);
        if bbox.is_empty() {
            continue;
        }
        for _ in 0..20 {
            let x = rng.gen_range(bbox.left()..bbox.right());
            let y = rng.gen_range(bbox.bot()..bbox.top());
            let region = Rect::from_sides(x, y, x + rng.gen_range(1..400), y + rng.gen_range(1..400));

            let mut expected = BTreeSet::new();
            naive_walk(&layout, top, LAYER, Transformation::identity(), region, &mut expected);

            for mode in [QueryMode::Accurate, QueryMode::Simple] {
                let option = ElementIteratorOption {
                    region: Some(region),
                    query: QueryKind::Shapes,
                    mode,
                    ..Default::default()
                };
                let found: BTreeSet<_> = ElementIterator::new(&layout, top, LAYER, option)
                    .map(|visit| (visit.element, visit.trans.offset_point()))
                    .collect();
                if mode == QueryMode::Accurate {
                    assert_eq!(found, expected);
                } else {
                    assert!(found.is_superset(&expected));
                }
            }
        }
    }
}

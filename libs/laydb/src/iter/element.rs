//! Hierarchical iteration over a cell and everything it instantiates.

use std::iter::Peekable;

use geometry::prelude::*;
use geometry::repetition::OffsetsIn;
use serde::{Deserialize, Serialize};

use super::cell::CellElementIterator;
use crate::element::{Element, ElementKind};
use crate::layer::Layer;
use crate::layout::Layout;
use crate::placement::Repeats;
use crate::spatial::{QueryKind, QueryMode};
use crate::CellId;

/// Options for an [`ElementIterator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementIteratorOption {
    /// Only visit elements touching this region, in the coordinates of the root cell.
    pub region: Option<Rect>,
    /// The deepest level to visit. The root cell is level 0.
    pub max_level: u32,
    /// Which elements to visit.
    pub query: QueryKind,
    /// How precisely spatial indices filter.
    pub mode: QueryMode,
    /// Visit every intersecting repeat of a repeated shape separately.
    ///
    /// Only takes effect for [`QueryKind::Shapes`].
    pub polygon_data: bool,
}

impl Default for ElementIteratorOption {
    fn default() -> Self {
        Self {
            region: None,
            max_level: u32::MAX,
            query: QueryKind::All,
            mode: QueryMode::Accurate,
            polygon_data: false,
        }
    }
}

/// An element reached by an [`ElementIterator`].
#[derive(Debug, Clone, PartialEq)]
pub struct Visit {
    /// The element, stored in `cell`.
    pub element: Element,
    /// Maps coordinates of `cell` to coordinates of the root cell.
    pub trans: Transformation,
    /// The cell storing the element.
    pub cell: CellId,
    /// The depth of `cell` below the root cell.
    pub level: u32,
    /// The repeat of a repeated shape, when repeats are visited separately.
    pub repeat: Option<usize>,
}

impl Visit {
    /// The outline of the visited shape in root coordinates.
    ///
    /// Rectangles, polygons and paths give their outline; a repeated shape
    /// gives the outline of the visited repeat. Anything else gives an empty ring.
    pub fn polygon_data(&self, layout: &Layout) -> Vec<Point> {
        let polygon = match (self.element, self.repeat) {
            (Element::Rect(_), _) => self.element.as_rect(layout).map(|r| Polygon::from_rect(*r)),
            (Element::Polygon(_), _) => self.element.as_polygon(layout).cloned(),
            (Element::Path(_), _) => self
                .element
                .as_path(layout)
                .map(|p| p.to_polygon().clone()),
            (Element::RectRep(_), Some(i)) => self
                .element
                .as_rect_rep(layout)
                .filter(|r| i < r.len())
                .map(|r| Polygon::from_rect(r.shape_at(i))),
            (Element::PolygonRep(_), Some(i)) => self
                .element
                .as_polygon_rep(layout)
                .filter(|r| i < r.len())
                .map(|r| r.shape_at(i)),
            _ => None,
        };
        polygon
            .map(|p| p.transform(self.trans).points().to_vec())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy)]
struct Context {
    cell: CellId,
    trans: Transformation,
    level: u32,
    region: Option<Rect>,
}

#[derive(Debug)]
struct Frame<'a> {
    context: Context,
    instances: CellElementIterator<'a>,
    repeats: Option<(CellId, Repeats<'a>)>,
}

/// Depth-first iterator over the elements of a cell and its descendants on one layer.
///
/// Cells are visited in pre-order: the elements of a cell come before the
/// elements of its children, children are visited in instance order and
/// repeated placements in repetition order. Subtrees that cannot contribute
/// to the region are skipped.
#[derive(Debug)]
pub struct ElementIterator<'a> {
    layout: &'a Layout,
    layer: Layer,
    option: ElementIteratorOption,
    stack: Vec<Frame<'a>>,
    elements: Option<(Context, Peekable<CellElementIterator<'a>>)>,
    expansion: Option<(Context, Element, OffsetsIn<'a>)>,
}

impl<'a> ElementIterator<'a> {
    /// Creates an iterator over `cell` and its descendants on `layer`.
    ///
    /// # Panics
    ///
    /// Panics if `cell` is not a cell of `layout`.
    pub fn new(
        layout: &'a Layout,
        cell: CellId,
        layer: Layer,
        mut option: ElementIteratorOption,
    ) -> Self {
        if let Some(region) = option.region {
            if region.contains_rect(&layout.cell_bbox(cell, layer)) {
                option.region = None;
            }
        }
        let context = Context {
            cell,
            trans: Transformation::identity(),
            level: 0,
            region: option.region,
        };
        let mut iter = Self {
            layout,
            layer,
            option,
            stack: Vec::new(),
            elements: None,
            expansion: None,
        };
        let elements = iter.cell_elements(&context, iter.option.query).peekable();
        let frame = iter.frame(context);
        iter.elements = Some((context, elements));
        iter.stack.push(frame);
        iter
    }

    /// The layout being iterated.
    pub fn layout(&self) -> &'a Layout {
        self.layout
    }

    /// The current depth of the traversal.
    pub fn level(&self) -> u32 {
        self.stack.len().saturating_sub(1) as u32
    }

    fn expands_repeats(&self) -> bool {
        self.option.polygon_data && self.option.query == QueryKind::Shapes
    }

    fn cell_elements(&self, context: &Context, kind: QueryKind) -> CellElementIterator<'a> {
        let mode = match kind {
            QueryKind::Instances => QueryMode::Accurate,
            _ => self.option.mode,
        };
        CellElementIterator::new(
            self.layout,
            context.cell,
            self.layer,
            context.region,
            kind,
            mode,
        )
    }

    fn frame(&self, context: Context) -> Frame<'a> {
        Frame {
            context,
            instances: self.cell_elements(&context, QueryKind::Instances),
            repeats: None,
        }
    }

    fn visit(context: &Context, element: Element, repeat: Option<usize>) -> Visit {
        Visit {
            element,
            trans: context.trans,
            cell: context.cell,
            level: context.level,
            repeat,
        }
    }

    /// Starts expanding a repeated shape into its repeats touching the region.
    fn expand(&mut self, context: Context, element: Element) {
        let layout = self.layout;
        let offsets = match element {
            Element::RectRep(_) => element.as_rect_rep(layout).map(|rep| {
                rep.intersecting(&context.region.unwrap_or_else(|| rep.bbox()))
            }),
            Element::PolygonRep(_) => element.as_polygon_rep(layout).map(|rep| {
                rep.intersecting(&context.region.unwrap_or_else(|| rep.bbox()))
            }),
            _ => None,
        };
        self.expansion = Some((context, element, offsets.unwrap_or_else(OffsetsIn::empty)));
    }

    /// Pushes the next child cell worth visiting, returning `false` once the traversal is over.
    fn descend(&mut self) -> bool {
        let layout = self.layout;
        while let Some(top) = self.stack.last_mut() {
            if top.context.level >= self.option.max_level {
                self.stack.pop();
                continue;
            }
            if let Some((child, repeats)) = &mut top.repeats {
                let child = *child;
                match repeats.next() {
                    Some((_, trans)) => {
                        let trans = Transformation::cascade(top.context.trans, trans);
                        let context = Context {
                            cell: child,
                            trans,
                            level: top.context.level + 1,
                            region: self.option.region.map(|r| trans.inv().apply_rect(r)),
                        };
                        let mut elements =
                            self.cell_elements(&context, self.option.query).peekable();
                        if elements.peek().is_none() && self.option.query.includes_instances() {
                            continue;
                        }
                        let frame = self.frame(context);
                        self.stack.push(frame);
                        self.elements = Some((context, elements));
                        return true;
                    }
                    None => top.repeats = None,
                }
                continue;
            }
            match top.instances.next() {
                Some(Element::Instance(inst)) => {
                    let Some(instance) = layout.cell(inst.cell).instance(inst.index as usize)
                    else {
                        continue;
                    };
                    let child = instance.cell();
                    if self.option.query == QueryKind::Instances
                        && layout.cell(child).instances().is_empty()
                    {
                        continue;
                    }
                    let bbox = layout.cell_bbox(child, self.layer);
                    if bbox.is_empty() {
                        continue;
                    }
                    let repeats = instance.placement().offsets_in(bbox, top.context.region);
                    top.repeats = Some((child, repeats));
                }
                _ => {
                    self.stack.pop();
                }
            }
        }
        false
    }
}

impl Iterator for ElementIterator<'_> {
    type Item = Visit;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((context, element, offsets)) = &mut self.expansion {
                if let Some((i, _)) = offsets.next() {
                    return Some(Self::visit(context, *element, Some(i)));
                }
                self.expansion = None;
            }
            if let Some((context, elements)) = &mut self.elements {
                let context = *context;
                if let Some(element) = elements.next() {
                    let kind = element.kind();
                    if self.expands_repeats()
                        && matches!(kind, ElementKind::RectRep | ElementKind::PolygonRep)
                    {
                        self.expand(context, element);
                        continue;
                    }
                    return Some(Self::visit(&context, element, None));
                }
                self.elements = None;
            }
            if !self.descend() {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::instance::Instance;
    use crate::placement::Placement;
    use crate::shape_rep::ShapeRepetition;

    const LAYER: Layer = Layer::new(1, 0);

    /// `top` -> `mid` -> `leaf`, plus `top` -> `side`, each with one rectangle.
    fn hierarchy(layout: &mut Layout) -> [CellId; 4] {
        let top = layout.create_cell("top").unwrap();
        let mid = layout.create_cell("mid").unwrap();
        let leaf = layout.create_cell("leaf").unwrap();
        let side = layout.create_cell("side").unwrap();
        for id in [top, mid, leaf, side] {
            layout.insert_shape(id, LAYER, Rect::from_sides(0, 0, 5, 5)).unwrap();
        }
        let rotated = Placement::new(
            Transformation::builder()
                .point(Point::new(100, 0))
                .rotation(Rotation::R90)
                .build(),
            None,
        );
        layout.insert_instance(top, Instance::new(mid, rotated)).unwrap();
        layout.insert_instance(top, Instance::new(side, Placement::default())).unwrap();
        let shifted = Placement::builder().offset(Point::new(10, 0)).build();
        layout.insert_instance(mid, Instance::new(leaf, shifted)).unwrap();
        [top, mid, leaf, side]
    }

    fn run(layout: &Layout, top: CellId, option: ElementIteratorOption) -> Vec<Visit> {
        ElementIterator::new(layout, top, LAYER, option).collect()
    }

    #[test]
    fn visits_cells_in_pre_order() {
        let mut layout = Layout::new();
        let [top, mid, leaf, side] = hierarchy(&mut layout);
        let option = ElementIteratorOption {
            query: QueryKind::Shapes,
            ..Default::default()
        };
        let visits = run(&layout, top, option);
        let cells: Vec<_> = visits.iter().map(|v| (v.cell, v.level)).collect();
        assert_eq!(cells, vec![(top, 0), (mid, 1), (leaf, 2), (side, 1)]);

        let leaf_visit = &visits[2];
        assert_eq!(
            leaf_visit.trans.apply_rect(Rect::from_sides(0, 0, 5, 5)),
            Rect::from_sides(95, 10, 100, 15)
        );
    }

    #[test]
    fn max_level_stops_descent() {
        let mut layout = Layout::new();
        let [top, ..] = hierarchy(&mut layout);
        for (max_level, expected) in [(0, 1), (1, 3), (2, 4)] {
            let option = ElementIteratorOption {
                max_level,
                query: QueryKind::Shapes,
                ..Default::default()
            };
            let visits = run(&layout, top, option);
            assert_eq!(visits.len(), expected);
            assert!(visits.iter().all(|v| v.level <= max_level));
        }
    }

    #[test]
    fn instance_queries_skip_leaf_children() {
        let mut layout = Layout::new();
        let [top, mid, ..] = hierarchy(&mut layout);
        let option = ElementIteratorOption {
            query: QueryKind::Instances,
            ..Default::default()
        };
        let visits: Vec<_> = run(&layout, top, option)
            .into_iter()
            .map(|v| (v.element, v.level))
            .collect();
        assert_eq!(
            visits,
            vec![
                (Element::instance(top, 0), 0),
                (Element::instance(top, 1), 0),
                (Element::instance(mid, 0), 1),
            ]
        );
    }

    #[test]
    fn region_prunes_subtrees() {
        let mut layout = Layout::new();
        let [top, _, leaf, side] = hierarchy(&mut layout);
        let option = ElementIteratorOption {
            region: Some(Rect::from_sides(96, 11, 99, 14)),
            query: QueryKind::Shapes,
            ..Default::default()
        };
        let visits = run(&layout, top, option);
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].cell, leaf);

        let option = ElementIteratorOption {
            region: Some(Rect::from_sides(1, 1, 2, 2)),
            ..Default::default()
        };
        let cells: Vec<_> = run(&layout, top, option).iter().map(|v| v.cell).collect();
        assert_eq!(cells, vec![top, top, side]);
    }

    #[test]
    fn polygon_data_expands_repeats() {
        let mut layout = Layout::new();
        let top = layout.create_cell("top").unwrap();
        layout
            .insert_shape(
                top,
                LAYER,
                ShapeRepetition::new(
                    Rect::from_sides(0, 0, 10, 10),
                    Repetition::array(1, 4, Point::zero(), Point::new(20, 0)),
                ),
            )
            .unwrap();
        let region = Some(Rect::from_sides(15, 0, 45, 10));

        let option = ElementIteratorOption {
            region,
            query: QueryKind::Shapes,
            ..Default::default()
        };
        let visits = run(&layout, top, option);
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].repeat, None);
        assert!(visits[0].polygon_data(&layout).is_empty());

        let option = ElementIteratorOption {
            region,
            query: QueryKind::Shapes,
            polygon_data: true,
            ..Default::default()
        };
        let visits = run(&layout, top, option);
        let repeats: Vec<_> = visits.iter().map(|v| v.repeat).collect();
        assert_eq!(repeats, vec![Some(1), Some(2)]);
        let outline: Vec<Point> = visits[1].polygon_data(&layout);
        assert_eq!(
            outline,
            Polygon::from_rect(Rect::from_sides(40, 0, 50, 10)).points().to_vec()
        );
    }
}

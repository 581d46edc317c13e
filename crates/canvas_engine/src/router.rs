//! # Wire Router
//!
//! An orthogonal A* router, grounded directly on
//! `examples/original_source/src/plugins/canvas/internal/CanvasWireRouting.cpp`:
//! the same `(x, y, dir)` state, turn penalty 3, `(f, g, dir, y, x)`
//! tie-break, 40000-visited cap, simple-path short-circuit, greedy
//! smoothing, waypoint stitching, and Manhattan fallback.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::collections::HashMap;

use glam::DVec2;

use crate::ids::FabricCoord;

const DIR_NONE: i8 = -1;
const AS_PAD: i32 = 16;

/// A read-only context the router consults: blocking predicate, lattice
/// step, and the visible scene rect used to size the search bounds.
pub trait RenderContext {
    fn fabric_step(&self) -> f64;
    fn fabric_blocked(&self, coord: FabricCoord) -> bool;
    /// Visible scene rect, if any, used to widen the A* search bounds.
    fn visible_scene_rect(&self) -> Option<crate::geometry::Rect>;
}

pub struct WireRouter<'a> {
    ctx: &'a dyn RenderContext,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct StateKey {
    x: i32,
    y: i32,
    dir: i8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Node {
    x: i32,
    y: i32,
    dir: i8,
    g: i64,
    f: i64,
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; we want the smallest (f, g, dir, y, x) on
        // top, so reverse the comparison.
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.g.cmp(&self.g))
            .then_with(|| other.dir.cmp(&self.dir))
            .then_with(|| other.y.cmp(&self.y))
            .then_with(|| other.x.cmp(&self.x))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Clone, Copy, Debug)]
struct CoordBounds {
    min_x: i32,
    max_x: i32,
    min_y: i32,
    max_y: i32,
}

impl CoordBounds {
    fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

fn bounds_from_rect(r: crate::geometry::Rect, step: f64) -> CoordBounds {
    CoordBounds {
        min_x: (r.left() / step).floor() as i32,
        max_x: (r.right() / step).ceil() as i32,
        min_y: (r.top() / step).floor() as i32,
        max_y: (r.bottom() / step).ceil() as i32,
    }
}

fn manhattan(x: i32, y: i32, goal: FabricCoord) -> i64 {
    ((x - goal.x).unsigned_abs() + (y - goal.y).unsigned_abs()) as i64
}

fn signum(v: i32) -> i32 {
    v.cmp(&0) as i32
}

fn dir_delta(dir: i8) -> (i32, i32) {
    match dir {
        0 => (1, 0),
        1 => (-1, 0),
        2 => (0, 1),
        3 => (0, -1),
        _ => (0, 0),
    }
}

fn ordered_dirs(current: i8) -> [i8; 4] {
    if current == DIR_NONE {
        return [0, 1, 2, 3];
    }
    let mut out = [0i8; 4];
    out[0] = current;
    let mut idx = 1;
    for d in [0, 1, 2, 3] {
        if d == current {
            continue;
        }
        out[idx] = d;
        idx += 1;
    }
    out
}

fn is_axis_aligned(a: FabricCoord, b: FabricCoord) -> bool {
    a.x == b.x || a.y == b.y
}

impl<'a> WireRouter<'a> {
    pub fn new(ctx: &'a dyn RenderContext) -> Self {
        Self { ctx }
    }

    fn effective_step(&self) -> f64 {
        let step = self.ctx.fabric_step();
        if step > 0.0 { step } else { 1.0 }
    }

    /// Routes a single orthogonal path between two lattice coords.
    pub fn route_segment(&self, start: FabricCoord, goal: FabricCoord) -> Vec<FabricCoord> {
        if start == goal {
            return vec![start];
        }

        if let Some(simple) = self.try_simple_path(start, goal) {
            return simple;
        }

        let coords = self
            .a_star_path(start, goal)
            .unwrap_or_else(|| Self::direct_manhattan_path(start, goal));
        self.smooth_path(&coords)
    }

    /// Routes through a chain of waypoints, stitching each consecutive pair
    /// independently and dropping the duplicate joint coord.
    pub fn route_coords_via_waypoints(&self, waypoints: &[FabricCoord]) -> Vec<FabricCoord> {
        if waypoints.len() < 2 {
            return waypoints.to_vec();
        }

        let mut coords: Vec<FabricCoord> = Vec::new();
        for w in waypoints.windows(2) {
            let seg = self.route_segment(w[0], w[1]);
            if coords.is_empty() {
                coords = seg;
            } else if !seg.is_empty() {
                coords.extend_from_slice(&seg[1..]);
            }
        }

        if coords.is_empty() {
            return self.route_segment(waypoints[0], waypoints[waypoints.len() - 1]);
        }
        coords
    }

    /// Routes between two fabric-space scene points, returning the scene
    /// path with the endpoints pinned to the original (unsnapped) positions.
    pub fn route_fabric_path(&self, a_fabric: DVec2, b_fabric: DVec2) -> Vec<DVec2> {
        let step = self.ctx.fabric_step();
        if step <= 0.0 {
            return orthogonal_fallback(a_fabric, b_fabric);
        }

        let start = crate::geometry::to_fabric_coord(a_fabric, step);
        let goal = crate::geometry::to_fabric_coord(b_fabric, step);
        if start == goal {
            return vec![a_fabric, b_fabric];
        }

        let coords = self.route_segment(start, goal);
        simplify_coords_to_scene(&coords, step, a_fabric, b_fabric)
    }

    pub fn route_via_waypoints(
        &self,
        waypoints: &[FabricCoord],
        a_fabric: DVec2,
        b_fabric: DVec2,
    ) -> Vec<DVec2> {
        let step = self.ctx.fabric_step();
        if step <= 0.0 {
            return orthogonal_fallback(a_fabric, b_fabric);
        }
        if waypoints.len() < 2 {
            return self.route_fabric_path(a_fabric, b_fabric);
        }

        let mut coords = self.route_coords_via_waypoints(waypoints);
        if coords.is_empty() {
            coords = self.route_segment(
                crate::geometry::to_fabric_coord(a_fabric, step),
                crate::geometry::to_fabric_coord(b_fabric, step),
            );
        }
        simplify_coords_to_scene(&coords, step, a_fabric, b_fabric)
    }

    /// Routes between two fabric-space scene points, honoring a user-pinned
    /// `routeOverride` when non-empty (the sole path by which the scene
    /// consumes a resolved route for drawing).
    pub fn route_with_override(&self, route_override: &[FabricCoord], a_fabric: DVec2, b_fabric: DVec2) -> Vec<DVec2> {
        if route_override.is_empty() {
            return self.route_fabric_path(a_fabric, b_fabric);
        }
        let step = self.ctx.fabric_step();
        simplify_coords_to_scene(route_override, step, a_fabric, b_fabric)
    }

    /// Escapes a blocked endpoint border point by stepping outward in
    /// `dir_delta` direction until reaching an unblocked coord, up to
    /// `max_steps`. Returns the original coord if no escape is found.
    pub fn escape(&self, coord: FabricCoord, side: crate::item::PortSide, max_steps: u32) -> FabricCoord {
        let (dx, dy) = match side {
            crate::item::PortSide::Left => (-1, 0),
            crate::item::PortSide::Right => (1, 0),
            crate::item::PortSide::Top => (0, -1),
            crate::item::PortSide::Bottom => (0, 1),
        };
        let mut cur = coord;
        for _ in 0..max_steps {
            if !self.ctx.fabric_blocked(cur) {
                return cur;
            }
            cur = FabricCoord::new(cur.x + dx, cur.y + dy);
        }
        if !self.ctx.fabric_blocked(cur) { cur } else { coord }
    }

    fn try_simple_path(&self, start: FabricCoord, goal: FabricCoord) -> Option<Vec<FabricCoord>> {
        if self.is_segment_clear(start, goal, true) {
            return Some(Self::direct_manhattan_path(start, goal));
        }

        let mid_h = FabricCoord::new(goal.x, start.y);
        let mid_v = FabricCoord::new(start.x, goal.y);

        let can_hv = self.is_segment_clear(start, mid_h, false) && self.is_segment_clear(mid_h, goal, true);
        let can_vh = self.is_segment_clear(start, mid_v, false) && self.is_segment_clear(mid_v, goal, true);
        if !can_hv && !can_vh {
            return None;
        }

        let prefer_horizontal = (goal.x - start.x).abs() >= (goal.y - start.y).abs();
        if prefer_horizontal {
            if can_hv {
                return Some(concat_segments(
                    Self::direct_manhattan_path(start, mid_h),
                    Self::direct_manhattan_path(mid_h, goal),
                ));
            }
            return Some(concat_segments(
                Self::direct_manhattan_path(start, mid_v),
                Self::direct_manhattan_path(mid_v, goal),
            ));
        }

        if can_vh {
            return Some(concat_segments(
                Self::direct_manhattan_path(start, mid_v),
                Self::direct_manhattan_path(mid_v, goal),
            ));
        }
        Some(concat_segments(
            Self::direct_manhattan_path(start, mid_h),
            Self::direct_manhattan_path(mid_h, goal),
        ))
    }

    fn a_star_path(&self, start: FabricCoord, goal: FabricCoord) -> Option<Vec<FabricCoord>> {
        if start == goal {
            return Some(vec![start]);
        }

        let step = self.effective_step();
        let mut bounds = CoordBounds {
            min_x: start.x.min(goal.x),
            max_x: start.x.max(goal.x),
            min_y: start.y.min(goal.y),
            max_y: start.y.max(goal.y),
        };
        if let Some(vis) = self.ctx.visible_scene_rect() {
            let v = bounds_from_rect(vis, step);
            bounds.min_x = bounds.min_x.min(v.min_x);
            bounds.max_x = bounds.max_x.max(v.max_x);
            bounds.min_y = bounds.min_y.min(v.min_y);
            bounds.max_y = bounds.max_y.max(v.max_y);
        }
        bounds.min_x -= AS_PAD;
        bounds.max_x += AS_PAD;
        bounds.min_y -= AS_PAD;
        bounds.max_y += AS_PAD;

        const TURN_PENALTY: i64 = 3;
        const MAX_VISITED: usize = 40_000;

        let start_key = StateKey { x: start.x, y: start.y, dir: DIR_NONE };
        let mut g_score: HashMap<StateKey, i64> = HashMap::new();
        let mut came_from: HashMap<StateKey, StateKey> = HashMap::new();
        let mut open: BinaryHeap<Node> = BinaryHeap::new();

        g_score.insert(start_key, 0);
        open.push(Node {
            x: start.x,
            y: start.y,
            dir: DIR_NONE,
            g: 0,
            f: manhattan(start.x, start.y, goal),
        });

        let mut visited = 0usize;
        while let Some(cur) = open.pop() {
            if visited >= MAX_VISITED {
                break;
            }
            let cur_key = StateKey { x: cur.x, y: cur.y, dir: cur.dir };
            match g_score.get(&cur_key) {
                Some(&g) if g == cur.g => {}
                _ => continue,
            }

            if cur.x == goal.x && cur.y == goal.y {
                return rebuild_path(&came_from, start_key, cur_key);
            }

            visited += 1;

            for dir in ordered_dirs(cur.dir) {
                let (dx, dy) = dir_delta(dir);
                let nx = cur.x + dx;
                let ny = cur.y + dy;
                if !bounds.contains(nx, ny) {
                    continue;
                }
                let nc = FabricCoord::new(nx, ny);
                let blocked = self.ctx.fabric_blocked(nc) && !(nx == goal.x && ny == goal.y);
                if blocked {
                    continue;
                }

                let step_cost = if cur.dir == DIR_NONE || cur.dir == dir { 1 } else { 1 + TURN_PENALTY };
                let ng = cur.g + step_cost;
                let next_key = StateKey { x: nx, y: ny, dir };
                if let Some(&existing) = g_score.get(&next_key) {
                    if ng >= existing {
                        continue;
                    }
                }
                came_from.insert(next_key, cur_key);
                g_score.insert(next_key, ng);
                open.push(Node { x: nx, y: ny, dir, g: ng, f: ng + manhattan(nx, ny, goal) });
            }
        }

        None
    }

    fn direct_manhattan_path(start: FabricCoord, goal: FabricCoord) -> Vec<FabricCoord> {
        let mut out = Vec::with_capacity(((goal.x - start.x).unsigned_abs() + (goal.y - start.y).unsigned_abs() + 1) as usize);
        let mut cur = start;
        out.push(cur);
        while cur.x != goal.x {
            cur.x += signum(goal.x - cur.x);
            out.push(cur);
        }
        while cur.y != goal.y {
            cur.y += signum(goal.y - cur.y);
            out.push(cur);
        }
        out
    }

    fn smooth_path(&self, path: &[FabricCoord]) -> Vec<FabricCoord> {
        if path.len() <= 2 {
            return path.to_vec();
        }

        let mut out = Vec::with_capacity(path.len());
        let mut i = 0usize;
        while i + 1 < path.len() {
            let mut best = i + 1;
            for j in (i + 1)..path.len() {
                if !is_axis_aligned(path[i], path[j]) {
                    continue;
                }
                let allow_end_blocked = j == path.len() - 1;
                if self.is_segment_clear(path[i], path[j], allow_end_blocked) {
                    best = j;
                }
            }
            out.push(path[i]);
            i = best;
        }
        out.push(*path.last().unwrap());
        out
    }

    fn is_segment_clear(&self, start: FabricCoord, end: FabricCoord, allow_end_blocked: bool) -> bool {
        if !is_axis_aligned(start, end) {
            return false;
        }
        let dx = signum(end.x - start.x);
        let dy = signum(end.y - start.y);
        let mut cur = start;
        loop {
            if cur != start {
                let is_end = cur == end;
                if self.ctx.fabric_blocked(cur) && !(allow_end_blocked && is_end) {
                    return false;
                }
            }
            if cur == end {
                break;
            }
            cur.x += dx;
            cur.y += dy;
        }
        true
    }
}

fn rebuild_path(
    came_from: &HashMap<StateKey, StateKey>,
    start_key: StateKey,
    goal_key: StateKey,
) -> Option<Vec<FabricCoord>> {
    let mut coords = Vec::new();
    let mut cur = goal_key;
    loop {
        coords.push(FabricCoord::new(cur.x, cur.y));
        if cur.x == start_key.x && cur.y == start_key.y && cur.dir == start_key.dir {
            break;
        }
        cur = *came_from.get(&cur)?;
    }
    coords.reverse();
    Some(coords)
}

fn concat_segments(a: Vec<FabricCoord>, b: Vec<FabricCoord>) -> Vec<FabricCoord> {
    if a.is_empty() {
        return b;
    }
    let mut out = a;
    if !b.is_empty() {
        out.extend_from_slice(&b[1..]);
    }
    out
}

fn orthogonal_fallback(a: DVec2, b: DVec2) -> Vec<DVec2> {
    if a == b || a.x == b.x || a.y == b.y {
        return vec![a, b];
    }
    vec![a, DVec2::new(b.x, a.y), b]
}

fn simplify_coords_to_scene(coords: &[FabricCoord], step: f64, a_fabric: DVec2, b_fabric: DVec2) -> Vec<DVec2> {
    if coords.is_empty() {
        return Vec::new();
    }

    let mut path: Vec<DVec2> = Vec::with_capacity(coords.len());
    for c in coords {
        let s = crate::geometry::to_scene_point(*c, step);
        if path.len() >= 2 {
            let p0 = path[path.len() - 2];
            let p1 = path[path.len() - 1];
            if (p0.x == p1.x && p1.x == s.x) || (p0.y == p1.y && p1.y == s.y) {
                let last = path.len() - 1;
                path[last] = s;
                continue;
            }
        }
        path.push(s);
    }

    let last = path.len() - 1;
    path[0] = a_fabric;
    path[last] = b_fabric;
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    struct TestCtx {
        step: f64,
        blocked: Vec<FabricCoord>,
    }

    impl RenderContext for TestCtx {
        fn fabric_step(&self) -> f64 {
            self.step
        }
        fn fabric_blocked(&self, coord: FabricCoord) -> bool {
            self.blocked.contains(&coord)
        }
        fn visible_scene_rect(&self) -> Option<Rect> {
            None
        }
    }

    #[test]
    fn unobstructed_route_is_direct_manhattan() {
        let ctx = TestCtx { step: 10.0, blocked: vec![] };
        let router = WireRouter::new(&ctx);
        let path = router.route_segment(FabricCoord::new(0, 0), FabricCoord::new(3, 2));
        for w in path.windows(2) {
            assert!(is_axis_aligned(w[0], w[1]));
            assert_eq!((w[0].x - w[1].x).abs() + (w[0].y - w[1].y).abs(), 1);
        }
    }

    #[test]
    fn router_is_deterministic_with_obstacle() {
        let blocked: Vec<FabricCoord> = (0..=2).flat_map(|x| (0..=2).map(move |y| FabricCoord::new(x, y))).collect();
        let ctx = TestCtx { step: 10.0, blocked };
        let router = WireRouter::new(&ctx);
        let p1 = router.route_segment(FabricCoord::new(0, 0), FabricCoord::new(3, 2));
        let p2 = router.route_segment(FabricCoord::new(0, 0), FabricCoord::new(3, 2));
        assert_eq!(p1, p2);
        assert!(!p1.iter().any(|c| c.x >= 1 && c.x <= 1 && c.y >= 1 && c.y <= 1));
    }

    #[test]
    fn route_segment_same_point_is_single_coord() {
        let ctx = TestCtx { step: 8.0, blocked: vec![] };
        let router = WireRouter::new(&ctx);
        let path = router.route_segment(FabricCoord::new(1, 1), FabricCoord::new(1, 1));
        assert_eq!(path, vec![FabricCoord::new(1, 1)]);
    }
}

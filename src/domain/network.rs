use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};
use std::cmp::Reverse;
use std::fs;
use std::path::Path;

use crate::api::topology::{BandSlotsDto, CoreSlotsDto, FiberDto, LinkDto, NetworkDto, NodeDto, SlotsDto};
use crate::api::routes::{RouteEntryDto, RoutesFileDto};
use crate::domain::fiber::{Band, Fiber, FiberType};
use crate::domain::link::{Link, LinkId};
use crate::domain::node::{Node, NodeId};
use crate::domain::route::{PathsTable, Route};
use crate::error::{Error, Result};
use crate::loader::parse_json_file;

/// The optical-network graph: arena-owned nodes and links, CSR-style
/// adjacency, the k-shortest-paths table and the slot mutation facade.
///
/// Cloning produces a structurally independent deep copy carrying the
/// current occupancy; that clone is what allocators plan against.
#[derive(Debug, Clone)]
pub struct Network {
    name: String,
    nodes: Vec<Node>,
    links: Vec<Link>,
    links_in: Vec<LinkId>,
    links_out: Vec<LinkId>,
    nodes_in: Vec<usize>,
    nodes_out: Vec<usize>,
    paths: Option<PathsTable>,
    path_k: usize,
}

/// Intermediate path representation used by the shortest-path algorithms.
#[derive(Debug, Clone)]
struct ShortestPath {
    node_path: Vec<NodeId>,
    link_path: Vec<LinkId>,
    total_length: f64,
}

impl PartialEq for ShortestPath {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ShortestPath {}

impl PartialOrd for ShortestPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ShortestPath {
    /// Total length first; ties resolve by lexicographic link-id sequence.
    fn cmp(&self, other: &Self) -> Ordering {
        self.total_length
            .partial_cmp(&other.total_length)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.link_path.cmp(&other.link_path))
    }
}

#[derive(Debug)]
struct QueueEntry {
    distance: f64,
    node: NodeId,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.node.cmp(&other.node))
    }
}

impl Default for Network {
    fn default() -> Self {
        Network::new()
    }
}

impl Network {
    pub fn new() -> Self {
        Network {
            name: "Unnamed Network".to_string(),
            nodes: Vec::new(),
            links: Vec::new(),
            links_in: Vec::new(),
            links_out: Vec::new(),
            nodes_in: vec![0],
            nodes_out: vec![0],
            paths: None,
            path_k: 0,
        }
    }

    /// Loads a topology file (see the DTO layer for the accepted `slots`
    /// shapes). Every (src, dst) link must be matched by a (dst, src) link;
    /// otherwise the load fails.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let dto: NetworkDto = parse_json_file(path)?;

        let mut network = Network::new();
        network.name = dto.name.clone();

        for node_dto in &dto.nodes {
            let node = node_from_dto(node_dto)
                .map_err(|e| Error::InvalidFile(format!("bad node in '{}': {}", path.display(), e)))?;
            network
                .add_node(node)
                .map_err(|e| Error::InvalidFile(format!("bad node in '{}': {}", path.display(), e)))?;
        }

        let mut link_pairs: HashMap<(i64, i64), i64> = HashMap::new();

        for link_dto in &dto.links {
            let fibers = fibers_from_dto(link_dto)
                .map_err(|e| Error::InvalidFile(format!("bad link {} in '{}': {}", link_dto.id, path.display(), e)))?;

            if link_dto.id < 0 || link_dto.src < 0 || link_dto.dst < 0 {
                return Err(Error::InvalidFile(format!(
                    "negative link id or endpoint in '{}'",
                    path.display()
                )));
            }
            let id = link_dto.id as LinkId;
            let src = link_dto.src as NodeId;
            let dst = link_dto.dst as NodeId;

            link_pairs.insert((link_dto.src, link_dto.dst), link_dto.id);

            let link = Link::with_fibers(id, link_dto.length, fibers)
                .map_err(|e| Error::InvalidFile(format!("bad link {} in '{}': {}", link_dto.id, path.display(), e)))?;
            network
                .add_link(link)
                .map_err(|e| Error::InvalidFile(format!("bad link in '{}': {}", path.display(), e)))?;
            network
                .connect(src, id, dst)
                .map_err(|e| Error::InvalidFile(format!("bad link {} in '{}': {}", id, path.display(), e)))?;
        }

        for (&(src, dst), &link_id) in &link_pairs {
            if !link_pairs.contains_key(&(dst, src)) {
                return Err(Error::InvalidFile(format!(
                    "network is not bidirectional: link {} from node {} to node {} exists, \
                     but the reverse link from {} to {} is missing",
                    link_id, src, dst, dst, src
                )));
            }
        }

        log::info!(
            "loaded network '{}' from '{}': {} nodes, {} links",
            network.name,
            path.display(),
            network.number_of_nodes(),
            network.number_of_links()
        );
        Ok(network)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a node; its id must equal the current node count.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if node.id() != self.nodes.len() {
            return Err(Error::InvalidArgument(format!(
                "cannot add node with id {} to a network with {} nodes",
                node.id(),
                self.nodes.len()
            )));
        }
        self.nodes.push(node);
        // keep prefix sums sized nodes + 1
        self.nodes_in.push(*self.nodes_in.last().unwrap_or(&0));
        self.nodes_out.push(*self.nodes_out.last().unwrap_or(&0));
        Ok(())
    }

    /// Appends a link; its id must equal the current link count.
    pub fn add_link(&mut self, link: Link) -> Result<()> {
        if link.id() != Some(self.links.len()) {
            return Err(Error::InvalidArgument(format!(
                "cannot add link with id {:?} to a network with {} links",
                link.id(),
                self.links.len()
            )));
        }
        self.links.push(link);
        Ok(())
    }

    /// Records `link_id` in the adjacency of `src` -> `dst` and stamps the
    /// link with its endpoints.
    pub fn connect(&mut self, src: NodeId, link_id: LinkId, dst: NodeId) -> Result<()> {
        if src >= self.nodes.len() {
            return Err(Error::OutOfRange(format!(
                "cannot connect source {}: network has {} nodes",
                src,
                self.nodes.len()
            )));
        }
        if dst >= self.nodes.len() {
            return Err(Error::OutOfRange(format!(
                "cannot connect destination {}: network has {} nodes",
                dst,
                self.nodes.len()
            )));
        }
        if link_id >= self.links.len() {
            return Err(Error::OutOfRange(format!(
                "cannot use link {}: network has {} links",
                link_id,
                self.links.len()
            )));
        }

        self.links_out.insert(self.nodes_out[src + 1], link_id);
        for count in self.nodes_out.iter_mut().skip(src + 1) {
            *count += 1;
        }

        self.links_in.insert(self.nodes_in[dst + 1], link_id);
        for count in self.nodes_in.iter_mut().skip(dst + 1) {
            *count += 1;
        }

        self.links[link_id].set_endpoints(src, dst);
        Ok(())
    }

    /// All link ids leading from `src` to `dst` (multi-edges included).
    pub fn is_connected(&self, src: NodeId, dst: NodeId) -> Vec<LinkId> {
        let mut link_ids = Vec::new();
        if src >= self.nodes.len() || dst >= self.nodes.len() {
            return link_ids;
        }
        for &link_id in &self.links_out[self.nodes_out[src]..self.nodes_out[src + 1]] {
            if self.links[link_id].dst() == Some(dst) {
                link_ids.push(link_id);
            }
        }
        link_ids
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| Error::OutOfRange(format!("node id {} out of range", id)))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        let count = self.nodes.len();
        self.nodes
            .get_mut(id)
            .ok_or_else(|| Error::OutOfRange(format!("node id {} out of range ({} nodes)", id, count)))
    }

    pub fn node_id_by_label(&self, label: &str) -> Option<NodeId> {
        self.nodes.iter().find(|node| node.label_opt() == Some(label)).map(|node| node.id())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn number_of_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn link(&self, id: LinkId) -> Result<&Link> {
        self.links
            .get(id)
            .ok_or_else(|| Error::OutOfRange(format!("link id {} out of range", id)))
    }

    pub fn link_mut(&mut self, id: LinkId) -> Result<&mut Link> {
        let count = self.links.len();
        self.links
            .get_mut(id)
            .ok_or_else(|| Error::OutOfRange(format!("link id {} out of range ({} links)", id, count)))
    }

    /// One link from `src` to `dst`, if any exists.
    pub fn link_between(&self, src: NodeId, dst: NodeId) -> Option<&Link> {
        self.is_connected(src, dst).first().map(|&id| &self.links[id])
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn number_of_links(&self) -> usize {
        self.links.len()
    }

    /// Out-degree of a node, straight from the adjacency prefix sums.
    pub fn out_degree(&self, node: NodeId) -> usize {
        if node >= self.nodes.len() {
            return 0;
        }
        self.nodes_out[node + 1] - self.nodes_out[node]
    }

    // ---- k-shortest paths ----

    /// Computes up to `k` loopless shortest paths by total link length for
    /// every ordered node pair (Dijkstra base path plus Yen deviations) and
    /// records each node's out-degree.
    pub fn set_paths(&mut self, k: usize) -> Result<()> {
        if k == 0 {
            return Err(Error::InvalidArgument(
                "number of shortest paths must be at least 1".to_string(),
            ));
        }

        let nodes = self.nodes.len();
        let mut table = PathsTable::new(nodes);

        for src in 0..nodes {
            for dst in 0..nodes {
                if src == dst {
                    continue;
                }
                let shortest = self.yen_k_shortest_paths(src, dst, k);
                if shortest.is_empty() {
                    continue;
                }
                let routes: Vec<Route> = shortest
                    .into_iter()
                    .map(|path| Route::new(path.link_path, path.total_length))
                    .collect();
                table.set_routes(src, dst, routes);
            }
        }

        self.paths = Some(table);
        self.path_k = k;
        self.record_degrees();
        Ok(())
    }

    /// Loads explicit per-direction paths from a routes file. Reverse
    /// directions are not synthesized; each path must be continuous and end
    /// at its declared destination.
    pub fn set_paths_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dto: RoutesFileDto = parse_json_file(path)?;

        let nodes = self.nodes.len();
        let mut table = PathsTable::new(nodes);
        let mut max_k = 0;

        for entry in &dto.routes {
            let routes = self.routes_from_entry(entry, path)?;
            if routes.is_empty() {
                continue;
            }
            max_k = max_k.max(routes.len());
            table.set_routes(entry.src as NodeId, entry.dst as NodeId, routes);
        }

        self.paths = Some(table);
        self.path_k = max_k;
        self.record_degrees();
        Ok(())
    }

    fn routes_from_entry(&self, entry: &RouteEntryDto, path: &Path) -> Result<Vec<Route>> {
        let nodes = self.nodes.len() as i64;
        if entry.src < 0 || entry.src >= nodes || entry.dst < 0 || entry.dst >= nodes {
            return Err(Error::InvalidFile(format!(
                "invalid node index in route (src={}, dst={}) in '{}'",
                entry.src,
                entry.dst,
                path.display()
            )));
        }
        let src = entry.src as NodeId;
        let dst = entry.dst as NodeId;

        let mut routes = Vec::with_capacity(entry.paths.len());
        for link_ids in &entry.paths {
            if link_ids.is_empty() {
                return Err(Error::InvalidFile(format!(
                    "each path must contain at least one link id in '{}'",
                    path.display()
                )));
            }

            let mut links = Vec::with_capacity(link_ids.len());
            let mut length = 0.0;
            let mut previous_dst: Option<NodeId> = None;

            for (position, &raw_id) in link_ids.iter().enumerate() {
                if raw_id < 0 || raw_id as usize >= self.links.len() {
                    return Err(Error::InvalidFile(format!(
                        "invalid link id {} in path in '{}'",
                        raw_id,
                        path.display()
                    )));
                }
                let link_id = raw_id as LinkId;
                let link = &self.links[link_id];

                if position == 0 {
                    if link.src() != Some(src) {
                        return Err(Error::InvalidFile(format!(
                            "first link {} does not start at source node {} in '{}'",
                            link_id,
                            src,
                            path.display()
                        )));
                    }
                } else if link.src() != previous_dst {
                    return Err(Error::InvalidFile(format!(
                        "path is not continuous at link {} in '{}'",
                        link_id,
                        path.display()
                    )));
                }

                previous_dst = link.dst();
                length += link.length();
                links.push(link_id);
            }

            if previous_dst != Some(dst) {
                return Err(Error::InvalidFile(format!(
                    "last link does not end at destination node {} in '{}'",
                    dst,
                    path.display()
                )));
            }

            routes.push(Route::new(links, length));
        }
        Ok(routes)
    }

    pub fn get_paths(&self) -> Option<&PathsTable> {
        self.paths.as_ref()
    }

    pub fn clear_paths(&mut self) {
        self.paths = None;
        self.path_k = 0;
    }

    pub fn path_k(&self) -> usize {
        self.path_k
    }

    fn record_degrees(&mut self) {
        for node in 0..self.nodes.len() {
            let degree = self.nodes_out[node + 1] - self.nodes_out[node];
            self.nodes[node].set_degree(degree);
        }
    }

    fn dijkstra(
        &self,
        src: NodeId,
        dst: NodeId,
        excluded_links: &HashSet<LinkId>,
        excluded_nodes: &HashSet<NodeId>,
    ) -> Option<ShortestPath> {
        let nodes = self.nodes.len();
        if src >= nodes || dst >= nodes {
            return None;
        }
        if excluded_nodes.contains(&src) || excluded_nodes.contains(&dst) {
            return None;
        }

        let mut distances = vec![f64::INFINITY; nodes];
        let mut previous_node: Vec<Option<NodeId>> = vec![None; nodes];
        let mut previous_link: Vec<Option<LinkId>> = vec![None; nodes];
        let mut visited = vec![false; nodes];

        distances[src] = 0.0;
        let mut queue = BinaryHeap::new();
        queue.push(Reverse(QueueEntry { distance: 0.0, node: src }));

        while let Some(Reverse(entry)) = queue.pop() {
            let current = entry.node;
            if visited[current] {
                continue;
            }
            visited[current] = true;

            if current == dst {
                break;
            }

            for &link_id in &self.links_out[self.nodes_out[current]..self.nodes_out[current + 1]] {
                if excluded_links.contains(&link_id) {
                    continue;
                }
                let link = &self.links[link_id];
                let Some(neighbor) = link.dst() else { continue };
                if excluded_nodes.contains(&neighbor) {
                    continue;
                }
                let candidate = entry.distance + link.length();
                if candidate < distances[neighbor] {
                    distances[neighbor] = candidate;
                    previous_node[neighbor] = Some(current);
                    previous_link[neighbor] = Some(link_id);
                    queue.push(Reverse(QueueEntry { distance: candidate, node: neighbor }));
                }
            }
        }

        if distances[dst].is_infinite() {
            return None;
        }

        let mut node_path = Vec::new();
        let mut link_path = Vec::new();
        let mut current = dst;
        loop {
            node_path.push(current);
            match (previous_node[current], previous_link[current]) {
                (Some(prev), Some(link)) => {
                    link_path.push(link);
                    current = prev;
                }
                _ => break,
            }
        }
        node_path.reverse();
        link_path.reverse();

        Some(ShortestPath { node_path, link_path, total_length: distances[dst] })
    }

    /// Yen's deviation enumeration: the base Dijkstra path plus up to k - 1
    /// next-shortest loopless paths found by constrained searches pinned at
    /// each spur node of the previous best path.
    fn yen_k_shortest_paths(&self, src: NodeId, dst: NodeId, k: usize) -> Vec<ShortestPath> {
        let mut k_paths: Vec<ShortestPath> = Vec::new();
        if k == 0 || src == dst {
            return k_paths;
        }

        let no_exclusions = HashSet::new();
        let Some(first) = self.dijkstra(src, dst, &no_exclusions, &no_exclusions) else {
            return k_paths;
        };

        let mut best_set: HashSet<Vec<LinkId>> = HashSet::new();
        let mut candidate_set: HashSet<Vec<LinkId>> = HashSet::new();
        let mut candidates: BinaryHeap<Reverse<ShortestPath>> = BinaryHeap::new();

        best_set.insert(first.link_path.clone());
        k_paths.push(first);

        for path_count in 1..k {
            let previous = k_paths[path_count - 1].clone();

            for spur_index in 0..previous.node_path.len() - 1 {
                let spur_node = previous.node_path[spur_index];
                let root_nodes = &previous.node_path[..spur_index + 1];
                let root_links = &previous.link_path[..spur_index];

                // Links that would reproduce an already-found path sharing
                // this root node prefix are removed at the spur.
                let mut removed_links = HashSet::new();
                for found in &k_paths {
                    if found.node_path.len() > spur_index
                        && found.node_path[..spur_index + 1] == *root_nodes
                        && spur_index < found.link_path.len()
                    {
                        removed_links.insert(found.link_path[spur_index]);
                    }
                }

                // Interior nodes of the root prefix stay off-limits.
                let excluded_nodes: HashSet<NodeId> =
                    root_nodes[..root_nodes.len().saturating_sub(1)].iter().copied().collect();

                let Some(spur_path) = self.dijkstra(spur_node, dst, &removed_links, &excluded_nodes)
                else {
                    continue;
                };

                let mut node_path = root_nodes.to_vec();
                node_path.extend_from_slice(&spur_path.node_path[1..]);

                let mut link_path = root_links.to_vec();
                link_path.extend_from_slice(&spur_path.link_path);

                if best_set.contains(&link_path) || candidate_set.contains(&link_path) {
                    continue;
                }

                let root_length: f64 = root_links.iter().map(|&id| self.links[id].length()).sum();
                let total = ShortestPath {
                    node_path,
                    link_path,
                    total_length: root_length + spur_path.total_length,
                };

                candidate_set.insert(total.link_path.clone());
                candidates.push(Reverse(total));
            }

            let Some(Reverse(best_candidate)) = candidates.pop() else {
                break;
            };
            candidate_set.remove(&best_candidate.link_path);
            best_set.insert(best_candidate.link_path.clone());
            k_paths.push(best_candidate);
        }

        k_paths
    }

    // ---- slot facade ----

    /// Marks the half-open slot range `[from, to)` with `owner`.
    pub fn use_slots(
        &mut self,
        link: LinkId,
        fiber: usize,
        core: usize,
        band: Band,
        mode: usize,
        from: usize,
        to: usize,
        owner: i32,
    ) -> Result<()> {
        self.validate_slot_range(link, fiber, core, band, mode, from, to)?;
        let fiber = self.links[link].fiber_mut(fiber)?;
        for pos in from..to {
            fiber.set_slot(core, band, mode, pos, owner)?;
        }
        Ok(())
    }

    /// Returns the half-open slot range `[from, to)` to free.
    pub fn unuse_slots(
        &mut self,
        link: LinkId,
        fiber: usize,
        core: usize,
        band: Band,
        mode: usize,
        from: usize,
        to: usize,
    ) -> Result<()> {
        self.use_slots(link, fiber, core, band, mode, from, to, crate::domain::fiber::FREE_SLOT)
    }

    /// The owner id stored at one slot.
    pub fn is_slot_used(
        &self,
        link: LinkId,
        fiber: usize,
        core: usize,
        band: Band,
        mode: usize,
        pos: usize,
    ) -> Result<i32> {
        self.link(link)?.fiber(fiber)?.slot(core, band, mode, pos)
    }

    pub(crate) fn validate_slot_range(
        &self,
        link: LinkId,
        fiber: usize,
        core: usize,
        band: Band,
        mode: usize,
        from: usize,
        to: usize,
    ) -> Result<()> {
        if from >= to {
            return Err(Error::InvalidArgument(format!("invalid slot range [{}, {})", from, to)));
        }
        let slot_count = self.link(link)?.fiber(fiber)?.number_of_slots(core, band, mode)?;
        if to > slot_count {
            return Err(Error::OutOfRange(format!(
                "slot range [{}, {}) exceeds {} slots",
                from, to, slot_count
            )));
        }
        Ok(())
    }

    // ---- export ----

    /// Writes the topology in the input format, regenerating the most
    /// compact slot form for each fiber. `type` is emitted only when the
    /// fiber is not SSMF.
    pub fn export_topology(&self, path: impl AsRef<Path>) -> Result<()> {
        let dto = NetworkDto {
            name: self.name.clone(),
            nodes: self.nodes.iter().map(node_to_dto).collect(),
            links: self.links.iter().map(link_to_dto).collect(),
        };
        let rendered = serde_json::to_string_pretty(&dto)?;
        fs::write(path.as_ref(), rendered)?;
        Ok(())
    }

    /// Writes the current paths table in the routes-file format.
    pub fn export_routes(&self, path: impl AsRef<Path>) -> Result<()> {
        let table = match &self.paths {
            Some(table) if !table.is_empty() => table,
            _ => {
                return Err(Error::Conflict(
                    "no paths have been computed yet; call set_paths first".to_string(),
                ))
            }
        };

        let mut entries = Vec::new();
        for src in 0..self.nodes.len() {
            for dst in 0..self.nodes.len() {
                if src == dst {
                    continue;
                }
                let routes = table.routes(src, dst);
                if routes.is_empty() {
                    continue;
                }
                entries.push(RouteEntryDto {
                    src: src as i64,
                    dst: dst as i64,
                    paths: routes
                        .iter()
                        .map(|route| route.links().iter().map(|&id| id as i64).collect())
                        .collect(),
                });
            }
        }

        let rendered = serde_json::to_string_pretty(&RoutesFileDto { routes: entries })?;
        fs::write(path.as_ref(), rendered)?;
        Ok(())
    }
}

// ---- DTO conversion ----

fn node_from_dto(dto: &NodeDto) -> Result<Node> {
    if dto.id < 0 {
        return Err(Error::InvalidArgument(format!("node id {} is negative", dto.id)));
    }
    let mut node = Node::new(dto.id as NodeId);
    if let Some(label) = &dto.label {
        node.set_label(label.clone());
    }
    if let Some(dc) = dto.dc {
        if dc < 0 {
            return Err(Error::InvalidArgument("number of DCs cannot be negative".to_string()));
        }
        node.set_dcs(dc as u32);
    }
    if let Some(ixp) = dto.ixp {
        if ixp < 0 {
            return Err(Error::InvalidArgument("number of IXPs cannot be negative".to_string()));
        }
        node.set_ixps(ixp as u32);
    }
    if let Some(population) = dto.population {
        node.set_population(population);
    }
    if let Some(longitude) = dto.longitude {
        node.set_longitude(longitude)?;
    }
    if let Some(latitude) = dto.latitude {
        node.set_latitude(latitude)?;
    }
    if let Some(param1) = dto.param1 {
        node.set_param1(param1);
    }
    if let Some(param2) = dto.param2 {
        node.set_param2(param2);
    }
    Ok(node)
}

fn fibers_from_dto(link_dto: &LinkDto) -> Result<Vec<Fiber>> {
    if let Some(fiber_dtos) = &link_dto.fibers {
        if link_dto.fiber_type.is_some() {
            log::warn!(
                "link {} has a link-level 'type' field that is ignored; with a 'fibers' array \
                 the type must be set per fiber",
                link_dto.id
            );
        }
        return fiber_dtos.iter().map(fiber_from_dto).collect();
    }

    let slots = link_dto
        .slots
        .as_ref()
        .ok_or_else(|| Error::InvalidArgument("link carries neither 'slots' nor 'fibers'".to_string()))?;
    let mut fiber = fiber_from_slots(slots)?;
    if let Some(type_name) = &link_dto.fiber_type {
        fiber.set_type(FiberType::from_name(type_name)?);
    }
    Ok(vec![fiber])
}

fn fiber_from_dto(dto: &FiberDto) -> Result<Fiber> {
    let mut fiber = fiber_from_slots(&dto.slots)?;
    if let Some(type_name) = &dto.fiber_type {
        fiber.set_type(FiberType::from_name(type_name)?);
    }
    Ok(fiber)
}

fn fiber_from_slots(slots: &SlotsDto) -> Result<Fiber> {
    match slots {
        SlotsDto::Count(count) => Fiber::with_slots(*count as usize),
        SlotsDto::Cores(cores) => {
            let mut matrix = BTreeMap::new();
            matrix.insert(Band::C, core_matrix_from_dto(cores));
            Fiber::from_band_matrix(&matrix)
        }
        SlotsDto::Bands(bands) => {
            let mut matrix = BTreeMap::new();
            for (band_key, band_slots) in bands {
                let band_char = band_key
                    .chars()
                    .next()
                    .ok_or_else(|| Error::InvalidArgument("empty band key".to_string()))?;
                let band = Band::from_char(band_char)?;
                let per_core = match band_slots {
                    BandSlotsDto::Count(count) => vec![vec![*count as usize]],
                    BandSlotsDto::Cores(cores) => core_matrix_from_dto(cores),
                };
                matrix.insert(band, per_core);
            }
            Fiber::from_band_matrix(&matrix)
        }
    }
}

fn core_matrix_from_dto(cores: &[CoreSlotsDto]) -> Vec<Vec<usize>> {
    cores
        .iter()
        .map(|core| match core {
            CoreSlotsDto::SingleMode(count) => vec![*count as usize],
            CoreSlotsDto::Modes(modes) => modes.iter().map(|&count| count as usize).collect(),
        })
        .collect()
}

fn node_to_dto(node: &Node) -> NodeDto {
    NodeDto {
        id: node.id() as i64,
        label: node.label_opt().map(str::to_string),
        dc: node.dcs().ok().map(|dc| dc as i64),
        ixp: node.ixps().ok().map(|ixp| ixp as i64),
        population: node.population().ok(),
        param1: node.param1().ok(),
        param2: node.param2().ok(),
        longitude: node.longitude().ok(),
        latitude: node.latitude().ok(),
    }
}

fn link_to_dto(link: &Link) -> LinkDto {
    let fibers = link.fibers();
    let (slots, fiber_dtos, fiber_type) = if fibers.len() == 1 {
        let fiber = &fibers[0];
        let type_name =
            (fiber.fiber_type() != FiberType::Ssmf).then(|| fiber.fiber_type().name().to_string());
        (Some(slots_to_dto(fiber)), None, type_name)
    } else {
        let dtos = fibers
            .iter()
            .map(|fiber| FiberDto {
                slots: slots_to_dto(fiber),
                fiber_type: (fiber.fiber_type() != FiberType::Ssmf)
                    .then(|| fiber.fiber_type().name().to_string()),
            })
            .collect();
        (None, Some(dtos), None)
    };

    LinkDto {
        id: link.id().unwrap_or(0) as i64,
        src: link.src().unwrap_or(0) as i64,
        dst: link.dst().unwrap_or(0) as i64,
        length: link.length(),
        slots,
        fibers: fiber_dtos,
        fiber_type,
    }
}

/// The most compact `slots` form consistent with the fiber's shape.
fn slots_to_dto(fiber: &Fiber) -> SlotsDto {
    let bands = fiber.bands();

    if bands.len() == 1 && bands[0] == Band::C {
        return match band_slots_to_dto(fiber, Band::C) {
            BandSlotsDto::Count(count) => SlotsDto::Count(count),
            BandSlotsDto::Cores(cores) => SlotsDto::Cores(cores),
        };
    }

    let mut per_band = BTreeMap::new();
    for band in bands {
        per_band.insert(band.to_char().to_string(), band_slots_to_dto(fiber, band));
    }
    SlotsDto::Bands(per_band)
}

fn band_slots_to_dto(fiber: &Fiber, band: Band) -> BandSlotsDto {
    let cores = fiber.number_of_cores();
    let core_matrix: Vec<Vec<u64>> = (0..cores)
        .map(|core| {
            let modes = fiber.number_of_modes(core, band).unwrap_or(0);
            (0..modes)
                .map(|mode| fiber.number_of_slots(core, band, mode).unwrap_or(0) as u64)
                .collect()
        })
        .collect();

    let single_mode = core_matrix.iter().all(|modes| modes.len() == 1);

    if cores == 1 {
        if single_mode {
            BandSlotsDto::Count(core_matrix[0][0])
        } else {
            BandSlotsDto::Cores(vec![CoreSlotsDto::Modes(core_matrix[0].clone())])
        }
    } else if single_mode {
        BandSlotsDto::Cores(core_matrix.iter().map(|modes| CoreSlotsDto::SingleMode(modes[0])).collect())
    } else {
        BandSlotsDto::Cores(core_matrix.into_iter().map(CoreSlotsDto::Modes).collect())
    }
}

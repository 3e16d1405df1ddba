use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Edges between node indices with self-loops and repeats removed; back
/// edges found by a DFS in node order are reversed so the result is acyclic.
pub(super) fn acyclic_edges(node_count: usize, edges: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    for &(from, to) in edges {
        if from == to || from >= node_count || to >= node_count {
            continue;
        }
        if seen.insert((from, to)) {
            adjacency[from].push(to);
        }
    }

    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    let mut marks = vec![Mark::New; node_count];
    let mut result: Vec<(usize, usize)> = Vec::new();
    for root in 0..node_count {
        if marks[root] != Mark::New {
            continue;
        }
        // Iterative DFS: (node, next child slot).
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        marks[root] = Mark::Active;
        while let Some(top) = stack.last_mut() {
            let (node, slot) = *top;
            if let Some(&next) = adjacency[node].get(slot) {
                top.1 += 1;
                match marks[next] {
                    Mark::New => {
                        result.push((node, next));
                        marks[next] = Mark::Active;
                        stack.push((next, 0));
                    }
                    Mark::Active => result.push((next, node)),
                    Mark::Done => result.push((node, next)),
                }
            } else {
                marks[node] = Mark::Done;
                stack.pop();
            }
        }
    }
    result.sort_unstable();
    result.dedup();
    result
}

/// Longest-path ranks over an acyclic edge list; sources sit on rank 0.
pub(super) fn assign_ranks(node_count: usize, edges: &[(usize, usize)]) -> Vec<usize> {
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut indeg = vec![0usize; node_count];
    for &(from, to) in edges {
        outgoing[from].push(to);
        indeg[to] += 1;
    }

    let mut ranks = vec![0usize; node_count];
    let mut ready: BinaryHeap<Reverse<usize>> = (0..node_count)
        .filter(|&idx| indeg[idx] == 0)
        .map(Reverse)
        .collect();
    while let Some(Reverse(node)) = ready.pop() {
        for &next in &outgoing[node] {
            ranks[next] = ranks[next].max(ranks[node] + 1);
            indeg[next] -= 1;
            if indeg[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }
    ranks
}

/// Splits every edge spanning more than one rank into a chain of virtual
/// slots, one per intermediate rank. Virtual indices follow the real ones
/// and their ranks are appended to `ranks`. Returns the expanded edge list
/// and the chain of each long edge keyed by its (upper, lower) endpoints.
pub(super) fn insert_virtual_nodes(
    dag: &[(usize, usize)],
    ranks: &mut Vec<usize>,
) -> (Vec<(usize, usize)>, HashMap<(usize, usize), Vec<usize>>) {
    let mut expanded = Vec::with_capacity(dag.len());
    let mut chains = HashMap::new();
    for &(from, to) in dag {
        let from_rank = ranks[from];
        let span = ranks[to].saturating_sub(from_rank);
        if span <= 1 {
            expanded.push((from, to));
            continue;
        }
        let mut chain = Vec::with_capacity(span - 1);
        let mut prev = from;
        for step in 1..span {
            let slot = ranks.len();
            ranks.push(from_rank + step);
            expanded.push((prev, slot));
            chain.push(slot);
            prev = slot;
        }
        expanded.push((prev, to));
        chains.insert((from, to), chain);
    }
    (expanded, chains)
}

/// Groups node indices by rank, each bucket in node order.
pub(super) fn rank_buckets(ranks: &[usize]) -> Vec<Vec<usize>> {
    let depth = ranks.iter().copied().max().map_or(0, |max| max + 1);
    let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); depth];
    for (idx, &rank) in ranks.iter().enumerate() {
        buckets[rank].push(idx);
    }
    buckets
}

/// Median-heuristic sweeps, down then up, to reduce edge crossings. Ties
/// keep the current order, then node order.
pub(super) fn order_rank_nodes(rank_nodes: &mut [Vec<usize>], edges: &[(usize, usize)], passes: usize) {
    if rank_nodes.len() <= 1 || passes == 0 {
        return;
    }
    let node_count = rank_nodes.iter().map(Vec::len).sum::<usize>();
    let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for &(from, to) in edges {
        if from < node_count && to < node_count {
            outgoing[from].push(to);
            incoming[to].push(from);
        }
    }

    let mut positions = vec![0usize; node_count];
    let update_positions = |rank_nodes: &[Vec<usize>], positions: &mut [usize]| {
        for bucket in rank_nodes {
            for (idx, &node) in bucket.iter().enumerate() {
                positions[node] = idx;
            }
        }
    };
    update_positions(rank_nodes, &mut positions);

    let sort_bucket = |bucket: &mut Vec<usize>, neighbors: &[Vec<usize>], positions: &[usize]| {
        let mut keyed: Vec<(f32, usize, usize)> = bucket
            .iter()
            .map(|&node| {
                let score = median_position(&neighbors[node], positions)
                    .unwrap_or(positions[node] as f32);
                (score, positions[node], node)
            })
            .collect();
        keyed.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then_with(|| a.1.cmp(&b.1))
                .then_with(|| a.2.cmp(&b.2))
        });
        *bucket = keyed.into_iter().map(|(_, _, node)| node).collect();
    };

    for _ in 0..passes {
        for rank in 1..rank_nodes.len() {
            if rank_nodes[rank].len() <= 1 {
                continue;
            }
            sort_bucket(&mut rank_nodes[rank], &incoming, &positions);
            update_positions(rank_nodes, &mut positions);
        }
        for rank in (0..rank_nodes.len() - 1).rev() {
            if rank_nodes[rank].len() <= 1 {
                continue;
            }
            sort_bucket(&mut rank_nodes[rank], &outgoing, &positions);
            update_positions(rank_nodes, &mut positions);
        }
    }
}

pub(super) fn median_position(neighbors: &[usize], positions: &[usize]) -> Option<f32> {
    if neighbors.is_empty() {
        return None;
    }
    let mut values: Vec<f32> = neighbors.iter().map(|&n| positions[n] as f32).collect();
    values.sort_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) * 0.5)
    }
}

/// Number of crossings between edges joining adjacent ranks.
pub(super) fn count_crossings(rank_nodes: &[Vec<usize>], ranks: &[usize], edges: &[(usize, usize)]) -> usize {
    let mut positions = vec![0usize; ranks.len()];
    for bucket in rank_nodes {
        for (idx, &node) in bucket.iter().enumerate() {
            positions[node] = idx;
        }
    }
    let adjacent: Vec<(usize, usize)> = edges
        .iter()
        .filter(|&&(from, to)| ranks[to] == ranks[from] + 1)
        .map(|&(from, to)| (positions[from], positions[to]))
        .collect();
    let mut crossings = 0;
    for (i, a) in adjacent.iter().enumerate() {
        for b in &adjacent[i + 1..] {
            if (a.0 < b.0 && a.1 > b.1) || (a.0 > b.0 && a.1 < b.1) {
                crossings += 1;
            }
        }
    }
    crossings
}

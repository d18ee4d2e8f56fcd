use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use cg_core::{ChargeDef, Position};
use cg_network::{Network, NetworkConfig, NetworkEventKind};

/// Members listed in the component table before eliding the rest.
const MAX_LISTED_MEMBERS: usize = 6;

/// A repeated withdrawal requested with `--draw`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Draw {
    pos: Position,
    amount: f64,
    satisfied: u64,
}

pub fn run(
    layout: &Path,
    ticks: u64,
    shuffle: Option<u64>,
    draws: &[String],
    removals: &[String],
    verbose: bool,
) -> Result<(), String> {
    if ticks == 0 {
        return Err("--ticks must be at least 1".into());
    }
    let mut draws = draws
        .iter()
        .map(|s| parse_draw(s))
        .collect::<Result<Vec<_>, _>>()?;
    let removals = removals
        .iter()
        .map(|s| s.parse::<Position>().map_err(|e| e.to_string()))
        .collect::<Result<Vec<_>, _>>()?;

    let grid = super::load_grid(layout)?;
    let mut order: Vec<(Position, ChargeDef)> =
        grid.iter().map(|(pos, block)| (pos, block.def)).collect();

    let config = NetworkConfig::default().with_max_events(500);
    let mut net = Network::new(grid, config);
    match shuffle {
        // One block per tick, so components grow and merge incrementally.
        Some(seed) => {
            order.shuffle(&mut StdRng::seed_from_u64(seed));
            for (pos, def) in order {
                net.request_register(pos, def);
                net.tick();
            }
        }
        None => {
            for (pos, def) in order {
                net.request_register(pos, def);
            }
        }
    }

    let staged = net.current_tick();
    for tick in 1..=ticks {
        let summary = net.tick();
        tracing::debug!(?summary, "tick finished");
        if tick == 1 {
            for pos in &removals {
                if net.world_mut().remove(*pos).is_none() {
                    return Err(format!("no block at {pos} to remove"));
                }
                net.request_deregister(*pos);
            }
        }
        for draw in &mut draws {
            if net.component_at(draw.pos).try_use_charge(draw.amount) {
                draw.satisfied += 1;
            }
        }
    }

    // Header
    let order_label = match shuffle {
        Some(seed) => format!("staggered over {staged} ticks, seed={seed}"),
        None => "layout order".to_string(),
    };
    println!(
        "  {} '{}' {}",
        "Simulation".bold(),
        net.world().name(),
        format!("({ticks} ticks, {order_label})").dimmed()
    );
    println!(
        "  {} nodes, {} components, {} events logged",
        net.node_count(),
        net.graph_count(),
        net.events().len()
    );
    if net.pending_count() > 0 {
        println!(
            "  {}",
            format!("{} changes pending until the next tick", net.pending_count()).yellow()
        );
    }
    println!();

    if verbose {
        println!("  {}", "Event Log".bold().underline());
        println!();
        for event in net.events().iter() {
            let tick_label = format!("[tick {:>3}]", event.tick).dimmed();
            let desc = colorize_event(&event.kind, &event.description);
            println!("  {tick_label} {desc}");
        }
        if net.events().is_empty() {
            println!("  {}", "(no events)".dimmed());
        }
        println!();
    }

    if !draws.is_empty() {
        println!("  {}", "Draws".bold().underline());
        for draw in &draws {
            let ratio = format!("{}/{ticks}", draw.satisfied);
            let ratio = if draw.satisfied == ticks {
                ratio.green()
            } else if draw.satisfied == 0 {
                ratio.red()
            } else {
                ratio.yellow()
            };
            println!("  {} at {}: {ratio} ticks satisfied", draw.amount, draw.pos);
        }
        println!();
    }

    println!("  {}", "Components".bold().underline());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Component", "Size", "Batteries", "Charge", "Members"]);
    for graph in net.graphs() {
        table.add_row(vec![
            graph.id().to_string(),
            graph.len().to_string(),
            graph.battery_count().to_string(),
            format!("{:.2}", graph.total_charge(net.nodes())),
            format_members(&graph.members().collect::<Vec<_>>()),
        ]);
    }
    let mut loose: Vec<Position> = net
        .nodes()
        .iter()
        .filter(|node| node.is_unassigned())
        .map(|node| node.position())
        .collect();
    loose.sort();
    if !loose.is_empty() {
        table.add_row(vec![
            "null".to_string(),
            loose.len().to_string(),
            "0".to_string(),
            "--".to_string(),
            format_members(&loose),
        ]);
    }

    println!("{table}");
    println!();

    Ok(())
}

fn parse_draw(s: &str) -> Result<Draw, String> {
    let (pos, amount) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid draw \"{s}\": expected x,y,z=amount"))?;
    let pos = pos.parse::<Position>().map_err(|e| e.to_string())?;
    let amount = amount
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid draw amount in \"{s}\""))?;
    Ok(Draw {
        pos,
        amount,
        satisfied: 0,
    })
}

fn format_members(members: &[Position]) -> String {
    let mut listed: Vec<String> = members
        .iter()
        .take(MAX_LISTED_MEMBERS)
        .map(Position::to_string)
        .collect();
    if members.len() > MAX_LISTED_MEMBERS {
        listed.push(format!("+{} more", members.len() - MAX_LISTED_MEMBERS));
    }
    listed.join(" ")
}

fn colorize_event(kind: &NetworkEventKind, description: &str) -> colored::ColoredString {
    match kind {
        NetworkEventKind::GraphConstructed { .. } => description.green(),
        NetworkEventKind::GraphMerged { .. } => description.cyan(),
        NetworkEventKind::GraphDestroyed { .. } => description.red(),
        NetworkEventKind::GraphPruned { .. } => description.dimmed(),
        NetworkEventKind::NodeInserted { .. }
        | NetworkEventKind::NodeReplaced { .. }
        | NetworkEventKind::NodeRemoved { .. } => description.normal(),
    }
}

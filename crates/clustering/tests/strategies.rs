use dslab_clustering::{
    error::ClusteringError,
    job::FixedDelay,
    strategies::{
        depth_greedy::DepthGreedyClustering,
        horizontal::{ClusterLimit, HorizontalClustering},
        hybrid::HybridBalancing,
        resource_aware::{order_by_impact, FactorMode, ResourceAwareBalancing},
        runtime::RuntimeBalancing,
    },
    strategy::{Clustering, ClusteringStrategy},
    task_set::TaskSetGraph,
    workflow::{TaskId, Workflow},
};

fn add(workflow: &mut Workflow, depth: usize, length: u64, parents: &[TaskId]) -> TaskId {
    let task = workflow.add_task(depth, length, length as f64, 1.0);
    for &parent in parents.iter() {
        workflow.add_dependency(parent, task).unwrap();
    }
    task
}

/// Every task is in exactly one job and the assignment index agrees with the jobs.
fn assert_partition(workflow: &Workflow, clustering: &Clustering) {
    let mut seen = vec![0; workflow.len()];
    for job in clustering.jobs.iter() {
        assert!(!job.tasks.is_empty());
        for &task in job.tasks.iter() {
            seen[task] += 1;
            assert_eq!(clustering.assignment.job_of(task), Some(job.id));
        }
    }
    assert!(seen.iter().all(|&count| count == 1), "{:?}", seen);
    assert!(workflow.tasks().iter().all(|task| task.assigned));
}

fn job_tasks(clustering: &Clustering) -> Vec<Vec<TaskId>> {
    clustering.jobs.iter().map(|job| job.tasks.clone()).collect()
}

/// Split task, 6 two-step pipelines and a merge task.
fn fork_join() -> Workflow {
    let mut workflow = Workflow::new();
    let split = add(&mut workflow, 0, 5, &[]);
    let mut tails = Vec::new();
    for i in 0..6u64 {
        let first = workflow.add_task(1, 10 * (i + 1), 10.0 * (i + 1) as f64, (i % 3 + 1) as f64);
        workflow.add_dependency(split, first).unwrap();
        let second = workflow.add_task(2, 7 * (i + 2), 7.0 * (i + 2) as f64, (i % 2 + 1) as f64);
        workflow.add_dependency(first, second).unwrap();
        tails.push(second);
    }
    add(&mut workflow, 3, 5, &tails);
    workflow
}

fn all_strategies() -> Vec<Box<dyn ClusteringStrategy>> {
    vec![
        Box::new(DepthGreedyClustering::new()),
        Box::new(HorizontalClustering::with_seed(ClusterLimit::Num(2), Some(1))),
        Box::new(HorizontalClustering::with_seed(ClusterLimit::Size(4), Some(1))),
        Box::new(HybridBalancing::new(2)),
        Box::new(ResourceAwareBalancing::new(2, FactorMode::Normalized)),
        Box::new(ResourceAwareBalancing::new(2, FactorMode::Raw)),
        Box::new(RuntimeBalancing::with_seed(2, Some(1))),
    ]
}

#[test]
fn every_strategy_partitions_tasks() {
    for mut strategy in all_strategies() {
        let mut workflow = fork_join();
        let clustering = strategy.run(&mut workflow).unwrap();
        assert_partition(&workflow, &clustering);
        for job in clustering.jobs.iter() {
            assert_eq!(
                job.runtime,
                job.tasks.iter().map(|&task| workflow.task(task).length).sum::<u64>()
            );
        }

        // running again on the same workflow starts from scratch
        let again = strategy.run(&mut workflow).unwrap();
        assert_partition(&workflow, &again);
    }
}

#[test]
fn depth_greedy_packs_parents_below_longest_parent() {
    let mut workflow = Workflow::new();
    let root = add(&mut workflow, 0, 1, &[]);
    let middle = add(&mut workflow, 1, 1, &[root]);
    let p10 = add(&mut workflow, 2, 10, &[middle]);
    let p20 = add(&mut workflow, 2, 20, &[middle]);
    let p5 = add(&mut workflow, 2, 5, &[middle]);
    let p8 = add(&mut workflow, 2, 8, &[middle]);
    let sink = add(&mut workflow, 3, 1, &[p10, p20, p5, p8]);

    let clustering = DepthGreedyClustering::new().run(&mut workflow).unwrap();
    assert_partition(&workflow, &clustering);
    assert_eq!(
        job_tasks(&clustering),
        vec![vec![sink], vec![p20], vec![p5, p8], vec![p10], vec![middle], vec![root]]
    );
    assert_eq!(clustering.jobs[0].parents, vec![3, 1, 2]);
    assert_eq!(clustering.jobs[4].children, vec![3, 1, 2]);
    assert_eq!(clustering.jobs[5].children, vec![4]);
    assert_eq!(clustering.jobs[2].depth, 2);
}

#[test]
fn depth_greedy_requires_parents() {
    let mut workflow = Workflow::new();
    workflow.add_task(2, 10, 10.0, 1.0);
    assert!(matches!(
        DepthGreedyClustering::new().run(&mut workflow),
        Err(ClusteringError::MissingParents { task: 0, depth: 2 })
    ));
}

#[test]
fn runtime_balancing_longest_first() {
    let mut workflow = Workflow::new();
    for length in [50, 40, 30, 20, 10] {
        add(&mut workflow, 0, length, &[]);
    }
    let clustering = RuntimeBalancing::with_seed(2, Some(7)).run(&mut workflow).unwrap();
    assert_partition(&workflow, &clustering);
    assert_eq!(job_tasks(&clustering), vec![vec![0, 3, 4], vec![1, 2]]);
    assert_eq!(
        clustering.jobs.iter().map(|job| job.runtime).collect::<Vec<_>>(),
        vec![80, 70]
    );
    assert_eq!(clustering.report.levels.len(), 1);
    assert_eq!(clustering.report.total_core_hour_wastage(), 0.0);
}

#[test]
fn runtime_balancing_accumulates_wastage() {
    let mut workflow = Workflow::new();
    let root = workflow.add_task(0, 10, 10.0, 1.0);
    workflow.add_task(0, 10, 10.0, 2.0);
    workflow.add_task(0, 10, 10.0, 4.0);
    for cores in [1.0, 3.0] {
        let child = workflow.add_task(1, 5, 5.0, cores);
        workflow.add_dependency(root, child).unwrap();
    }

    let clustering = RuntimeBalancing::with_seed(1, Some(3)).run(&mut workflow).unwrap();
    assert_partition(&workflow, &clustering);
    assert_eq!(clustering.jobs.len(), 2);
    assert_eq!(
        clustering
            .report
            .levels
            .iter()
            .map(|level| level.core_hour_wastage)
            .collect::<Vec<_>>(),
        vec![Some(50.0), Some(10.0)]
    );
    assert_eq!(clustering.report.total_core_hour_wastage(), 60.0);
    assert_eq!(clustering.report.wastage().levels(), 2);
}

#[test]
fn seeded_runs_are_reproducible() {
    let mut first = fork_join();
    let mut second = fork_join();
    let a = RuntimeBalancing::with_seed(3, Some(42)).run(&mut first).unwrap();
    let b = RuntimeBalancing::with_seed(3, Some(42)).run(&mut second).unwrap();
    assert_eq!(job_tasks(&a), job_tasks(&b));

    let a = HorizontalClustering::with_seed(ClusterLimit::Num(4), Some(42))
        .run(&mut first)
        .unwrap();
    let b = HorizontalClustering::with_seed(ClusterLimit::Num(4), Some(42))
        .run(&mut second)
        .unwrap();
    assert_eq!(job_tasks(&a), job_tasks(&b));
}

#[test]
fn horizontal_keeps_levels_apart() {
    let mut workflow = Workflow::new();
    let roots = (0..7).map(|_| add(&mut workflow, 0, 10, &[])).collect::<Vec<_>>();
    add(&mut workflow, 1, 10, &roots);

    let clustering = HorizontalClustering::with_seed(ClusterLimit::Num(3), Some(5))
        .run(&mut workflow)
        .unwrap();
    assert_partition(&workflow, &clustering);
    assert_eq!(
        clustering.jobs.iter().map(|job| job.tasks.len()).collect::<Vec<_>>(),
        vec![3, 2, 2, 1]
    );
    for job in clustering.jobs.iter() {
        assert!(job.tasks.iter().all(|&task| workflow.task(task).depth == job.depth));
    }
    let mut parents = clustering.jobs[3].parents.clone();
    parents.sort();
    assert_eq!(parents, vec![0, 1, 2]);
}

#[test]
fn hybrid_groups_sets_sharing_children() {
    let mut workflow = Workflow::new();
    let roots = (0..4).map(|_| add(&mut workflow, 0, 10, &[])).collect::<Vec<_>>();
    add(&mut workflow, 1, 10, &[roots[0], roots[1]]);
    add(&mut workflow, 1, 10, &[roots[2], roots[3]]);

    let clustering = HybridBalancing::new(2).run(&mut workflow).unwrap();
    assert_partition(&workflow, &clustering);
    assert_eq!(job_tasks(&clustering), vec![vec![0, 1], vec![2, 3], vec![4], vec![5]]);
    assert_eq!(clustering.jobs[0].children, vec![2]);
    assert_eq!(clustering.jobs[1].children, vec![3]);
    assert_eq!(clustering.report.levels.len(), 1);
    assert_eq!(clustering.report.fallbacks(), 0);
}

#[test]
fn hybrid_collapses_chains() {
    let mut workflow = Workflow::new();
    let roots = (0..3).map(|_| add(&mut workflow, 0, 10, &[])).collect::<Vec<_>>();
    for &root in roots.iter() {
        add(&mut workflow, 1, 10, &[root]);
    }

    let clustering = HybridBalancing::new(2).run(&mut workflow).unwrap();
    assert_partition(&workflow, &clustering);
    assert_eq!(job_tasks(&clustering), vec![vec![0], vec![1, 2, 5], vec![3], vec![4]]);
}

#[test]
fn hybrid_accepts_seed_as_far_as_farthest_pair() {
    let mut workflow = Workflow::new();
    let roots = [30, 20, 10, 40]
        .into_iter()
        .map(|length| add(&mut workflow, 0, length, &[]))
        .collect::<Vec<_>>();
    for &root in roots.iter() {
        add(&mut workflow, 1, 10, &[root]);
    }

    let clustering = HybridBalancing::new(3).run(&mut workflow).unwrap();
    assert_partition(&workflow, &clustering);
    // seeds are sets 1, 0 and 2, set 3 joins the lightest receiver and pulls its child along
    assert_eq!(
        job_tasks(&clustering),
        vec![vec![0], vec![1], vec![2, 3, 7], vec![4], vec![5], vec![6]]
    );
    assert_eq!(clustering.report.levels.len(), 1);
    assert_eq!(clustering.report.levels[0].receivers, 3);
    assert_eq!(clustering.report.fallbacks(), 0);
}

#[test]
fn hybrid_fills_nearest_tier_before_empty_receivers() {
    let mut workflow = Workflow::new();
    let roots = (0..4).map(|_| add(&mut workflow, 0, 10, &[])).collect::<Vec<_>>();
    add(&mut workflow, 1, 10, &[roots[0], roots[2], roots[3]]);
    add(&mut workflow, 1, 10, &[roots[1]]);

    let clustering = HybridBalancing::new(3).run(&mut workflow).unwrap();
    assert_partition(&workflow, &clustering);
    assert_eq!(job_tasks(&clustering), vec![vec![0, 2], vec![1, 3], vec![4], vec![5]]);
    assert_eq!(clustering.report.levels[0].receivers, 3);
    assert_eq!(clustering.report.fallbacks(), 0);
}

#[test]
fn hybrid_falls_back_when_receivers_are_full() {
    let mut workflow = Workflow::new();
    for _ in 0..6 {
        add(&mut workflow, 0, 10, &[]);
    }
    let middle = add(&mut workflow, 1, 10, &[2]);
    add(&mut workflow, 2, 10, &[middle]);

    let clustering = HybridBalancing::new(2).run(&mut workflow).unwrap();
    assert_partition(&workflow, &clustering);
    assert_eq!(job_tasks(&clustering), vec![vec![0, 3, 4], vec![1, 2, 6, 7, 5]]);
    assert_eq!(clustering.report.fallbacks(), 1);
}

#[test]
fn balancing_respects_capacity() {
    let strategies: Vec<Box<dyn ClusteringStrategy>> = vec![
        Box::new(HybridBalancing::new(3)),
        Box::new(ResourceAwareBalancing::new(3, FactorMode::Normalized)),
    ];
    for mut strategy in strategies {
        let mut workflow = Workflow::new();
        for i in 0..8u64 {
            workflow.add_task(0, 10 + i, (10 + i) as f64, (i % 4 + 1) as f64);
        }
        let clustering = strategy.run(&mut workflow).unwrap();
        assert_partition(&workflow, &clustering);
        assert!(clustering.jobs.len() <= 3);
        assert!(clustering.jobs.iter().all(|job| job.tasks.len() <= 3));
        assert_eq!(clustering.report.fallbacks(), 0);
    }
}

#[test]
fn resource_aware_normalizes_every_level() {
    let mut workflow = Workflow::new();
    for (cores, exec_time) in [(2.0, 5.0), (4.0, 5.0), (6.0, 5.0)] {
        workflow.add_task(0, 10, exec_time, cores);
    }
    let clustering = ResourceAwareBalancing::new(5, FactorMode::Normalized)
        .run(&mut workflow)
        .unwrap();
    assert_partition(&workflow, &clustering);
    assert_eq!(clustering.jobs.len(), 3);
    assert_eq!(
        workflow.tasks().iter().map(|task| task.normalized_cores).collect::<Vec<_>>(),
        vec![0.0, 0.5, 1.0]
    );
    assert!(workflow.tasks().iter().all(|task| task.normalized_runtime == 0.0));
}

#[test]
fn resource_aware_prefers_heavier_receiver_on_equal_factor() {
    let mut workflow = Workflow::new();
    for exec_time in [0.0, 10.0, 0.0, 10.0] {
        workflow.add_task(0, 10, exec_time, 1.0);
    }
    let clustering = ResourceAwareBalancing::new(2, FactorMode::Normalized)
        .run(&mut workflow)
        .unwrap();
    assert_partition(&workflow, &clustering);
    assert_eq!(job_tasks(&clustering), vec![vec![0, 1], vec![2, 3]]);
    assert_eq!(clustering.report.levels[0].core_hour_wastage, Some(0.0));
}

#[test]
fn resource_aware_reports_wastage() {
    let mut workflow = fork_join();
    let clustering = ResourceAwareBalancing::new(2, FactorMode::Raw).run(&mut workflow).unwrap();
    assert_partition(&workflow, &clustering);
    assert!(!clustering.report.levels.is_empty());
    for level in clustering.report.levels.iter() {
        assert!(level.core_hour_wastage.unwrap() >= 0.0);
    }
}

#[test]
fn cluster_delay_hook() {
    let mut workflow = fork_join();
    let mut clustering = HybridBalancing::new(3).run(&mut workflow).unwrap();
    clustering.apply_cluster_delay(&FixedDelay(2.5));
    assert!(clustering.jobs.iter().all(|job| job.delay == 2.5));
}

#[test]
fn job_dependencies_follow_task_edges() {
    for mut strategy in all_strategies() {
        let mut workflow = fork_join();
        let clustering = strategy.run(&mut workflow).unwrap();
        for task in workflow.tasks() {
            let from = clustering.assignment.job_of(task.id).unwrap();
            for &child in task.children().iter() {
                let to = clustering.assignment.job_of(child).unwrap();
                if from != to {
                    assert!(clustering.jobs[from].children.contains(&to));
                    assert!(clustering.jobs[to].parents.contains(&from));
                }
            }
        }
    }
}

#[test]
fn empty_workflow() {
    for mut strategy in all_strategies() {
        let mut workflow = Workflow::new();
        let clustering = strategy.run(&mut workflow).unwrap();
        assert!(clustering.jobs.is_empty());
    }
}

#[test]
fn cyclic_workflow_is_rejected() {
    for mut strategy in all_strategies() {
        let mut workflow = Workflow::new();
        let a = add(&mut workflow, 0, 10, &[]);
        let b = add(&mut workflow, 0, 10, &[a]);
        add(&mut workflow, 0, 10, &[]);
        workflow.add_dependency(b, a).unwrap();
        assert!(matches!(strategy.run(&mut workflow), Err(ClusteringError::Cycle)));
    }
}

#[test]
fn raw_order_groups_close_impact_factors() {
    let mut workflow = Workflow::new();
    for length in [40, 10, 30, 50, 20] {
        add(&mut workflow, 0, length, &[]);
    }
    let (mut sets, _) = TaskSetGraph::from_workflow(&workflow);
    for (set, impact) in [0.5, 0.5 + 0.6e-8, 0.5 + 1.2e-8, 0.2, 0.5 + 0.3e-8].into_iter().enumerate() {
        sets.set_impact_factor(set, impact);
    }

    let mut level = vec![0, 1, 2, 3, 4];
    order_by_impact(&mut level, &sets);
    assert_eq!(level, vec![3, 1, 4, 2, 0]);

    let mut reversed = vec![4, 3, 2, 1, 0];
    order_by_impact(&mut reversed, &sets);
    assert_eq!(reversed, level);
}

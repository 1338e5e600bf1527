// 该文件是 DFU Detect （足部溃疡检测） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

mod args;
mod command;

use std::{
  io::{BufRead, Write},
  path::{Path, PathBuf},
};

use anyhow::{Result, bail};
use clap::Parser;
use tracing::{error, info};

use command::{Command, HELP};
use dfu_detect::{
  batch::ProcessReport,
  model::{DetectParams, LabelFallback, LabelMap, ModelCatalog, OnnxYolo, OnnxYoloLoader},
  output::{DetectionTable, Download, Draw},
  session::{Event, Outcome, Pipeline, Session},
};

fn load_pipeline(args: &args::Args) -> Result<Pipeline<OnnxYolo>> {
  let catalog = ModelCatalog::new(args.model.clone())?;
  for name in catalog.names() {
    info!("可选模型: {}", name);
  }

  let loader = OnnxYoloLoader::default().input_size(args.input_size);
  let mut pipeline = Pipeline::load(catalog, loader);
  if let Some(name) = &args.select {
    pipeline.select_model(name)?;
  }
  Ok(pipeline)
}

fn default_archive_path() -> PathBuf {
  PathBuf::from(format!(
    "dfu-detections-{}.zip",
    chrono::Local::now().format("%Y%m%d-%H%M%S")
  ))
}

fn save_download(download: &Download, path: &Path) -> Result<()> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(path, &download.bytes)?;
  println!(
    "已保存 {} ({}, {} 字节) 到 {}",
    download.file_name,
    download.mime,
    download.bytes.len(),
    path.display()
  );
  Ok(())
}

fn print_reports(reports: &[ProcessReport]) {
  for report in reports {
    match &report.result {
      Ok(0) => println!("  {}: 未检测到溃疡", report.name),
      Ok(n) => println!("  {}: 检测到 {} 个溃疡区域", report.name, n),
      Err(e) => println!("  {}: 失败 - {}", report.name, e),
    }
  }
}

fn print_tables(session: &Session) {
  if session.batch().is_empty() {
    println!("尚未上传图像");
    return;
  }
  for name in session.batch().names() {
    match session.batch().result(name) {
      Some(annotated) => {
        println!("== {}", name);
        print!("{}", DetectionTable::new(annotated.detections()));
      }
      None => println!("== {} (未处理)", name),
    }
  }
}

fn print_status<D>(session: &Session, pipeline: &Pipeline<D>) {
  let batch = session.batch();
  println!(
    "模型: {} [{}] ({})",
    pipeline.model_name(),
    pipeline.model_path(),
    if pipeline.is_available() { "已加载" } else { "不可用" }
  );
  println!(
    "置信度阈值: {:.2}, IoU 阈值: {:.2}",
    session.params().confidence(),
    session.params().iou()
  );
  println!(
    "图像: {}, 已完成: {}, 可导出: {}",
    batch.len(),
    batch.results().count(),
    if batch.is_complete() { "是" } else { "否" }
  );
  for (name, reason) in batch.failures() {
    println!("  {}: {}", name, reason);
  }
}

/// 打印事件结果；若产生下载则写入 `target`
fn report(outcome: Outcome, target: Option<PathBuf>) -> Result<bool> {
  match outcome {
    Outcome::Uploaded(summary) => {
      println!("已上传: {}", summary.accepted.join(", "));
      if !summary.duplicates.is_empty() {
        println!("重复文件已忽略: {}", summary.duplicates.join(", "));
      }
      for failure in &summary.failed {
        println!("  {}: 读取失败 - {}", failure.name, failure.reason);
      }
      if summary.invalidated {
        println!("旧的检测结果已清除");
      }
      return Ok(summary.failed.is_empty());
    }
    Outcome::ModelSelected {
      name,
      path,
      available,
      invalidated,
    } => {
      if available {
        println!("当前模型: {} ({})", name, path);
      } else {
        println!("模型 {} 无法加载，请检查模型路径: {}", name, path);
      }
      if invalidated {
        println!("旧的检测结果已清除");
      }
      return Ok(available);
    }
    Outcome::ThresholdChanged { params, invalidated } => {
      println!(
        "置信度阈值: {:.2}, IoU 阈值: {:.2}{}",
        params.confidence(),
        params.iou(),
        if invalidated { "，旧的检测结果已清除" } else { "" }
      );
    }
    Outcome::Processed(reports) => {
      println!("检测完成:");
      print_reports(&reports);
      return Ok(reports.iter().all(|r| r.result.is_ok()));
    }
    Outcome::Download(download) => {
      let path = target.unwrap_or_else(|| PathBuf::from(&download.file_name));
      save_download(&download, &path)?;
    }
    Outcome::Cleared => println!("批次已清空"),
    Outcome::Rejected(e) => {
      println!("错误: {}", e);
      return Ok(false);
    }
  }
  Ok(true)
}

fn run_interactive<D: dfu_detect::model::Detector>(
  mut session: Session,
  pipeline: &mut Pipeline<D>,
) -> Result<()> {
  println!("{}", HELP);
  let stdin = std::io::stdin();
  loop {
    print!("> ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    if stdin.lock().read_line(&mut line)? == 0 {
      break;
    }
    if line.trim().is_empty() {
      continue;
    }

    let command: Command = match line.parse() {
      Ok(command) => command,
      Err(e) => {
        println!("{}", e);
        continue;
      }
    };

    let (event, target) = match command {
      Command::Upload(paths) => (Event::UploadFiles(paths), None),
      Command::Confidence(v) => (Event::SetConfidence(v), None),
      Command::Iou(v) => (Event::SetIou(v), None),
      Command::Model(Some(name)) => (Event::SelectModel(name), None),
      Command::Model(None) => {
        for name in pipeline.model_names() {
          let marker = if name == pipeline.model_name() { "*" } else { " " };
          println!("{} {}", marker, name);
        }
        continue;
      }
      Command::Detect => (Event::Detect, None),
      Command::Save { name, path } => (Event::DownloadImage(name), Some(path)),
      Command::Export(path) => (Event::Export, Some(path.unwrap_or_else(default_archive_path))),
      Command::Clear => (Event::Clear, None),
      Command::Table => {
        print_tables(&session);
        continue;
      }
      Command::Status => {
        print_status(&session, pipeline);
        continue;
      }
      Command::Help => {
        println!("{}", HELP);
        continue;
      }
      Command::Quit => break,
    };

    let (next, outcome) = session.handle(event, pipeline);
    session = next;
    if let Err(e) = report(outcome, target) {
      error!("{}", e);
    }
  }
  Ok(())
}

fn run_batch<D: dfu_detect::model::Detector>(
  session: Session,
  pipeline: &mut Pipeline<D>,
  inputs: &[PathBuf],
  output: Option<PathBuf>,
) -> Result<()> {
  let (session, outcome) = session.handle(Event::UploadFiles(inputs.to_vec()), pipeline);
  if !report(outcome, None)? {
    bail!("部分图像读取失败，未导出");
  }

  let (session, outcome) = session.handle(Event::Detect, pipeline);
  let all_ok = report(outcome, None)?;
  print_tables(&session);
  if !all_ok {
    bail!("部分图像处理失败，未导出");
  }

  let (_, outcome) = session.handle(Event::Export, pipeline);
  if !report(outcome, Some(output.unwrap_or_else(default_archive_path)))? {
    bail!("导出失败");
  }
  Ok(())
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("置信度阈值: {}", args.confidence);
  info!("NMS IoU 阈值: {}", args.iou);

  let params = DetectParams::new(args.confidence, args.iou)?;

  let labels = match &args.labels {
    Some(path) => LabelMap::from_path(path)?,
    None => LabelMap::default(),
  };
  let labels = if args.numeric_labels {
    labels.with_fallback(LabelFallback::Numeric)
  } else {
    labels
  };

  let draw = Draw::default().with_color(args.color);
  let draw = match &args.font {
    Some(path) => draw.with_font(Draw::load_font(path)?),
    None => draw,
  };
  if !draw.has_font() {
    bail!("无法加载标签字体，请使用 --font 指定");
  }

  let mut pipeline = load_pipeline(&args)?
    .with_draw(draw)
    .with_labels(labels)
    .with_jpeg_quality(args.jpeg_quality);

  let session = Session::new(params);
  if args.input.is_empty() {
    run_interactive(session, &mut pipeline)
  } else {
    run_batch(session, &mut pipeline, &args.input, args.output)
  }
}

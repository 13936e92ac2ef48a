//! 控制流程
//!
//! 固定的线性步骤：连接 → 复位 → 服务模式下配置 L3 并解析网关 → 打印端口信息 →
//! 每端口下发一条流 → 开始发送 → 每秒轮询打印速率。每一步之间检查中断。

use std::io::Write;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use super::client::{PortId, TrafficClient};
use super::config::TrafficConfig;
use super::error::ControlError;
use super::plan::StreamPlan;
use super::report;
use super::session::{Interrupt, Session};

/// 两个端口，下标即方向
pub const PORTS: [PortId; 2] = [0, 1];
/// 每隔多少行重打表头
pub const HEADER_EVERY: usize = 25;
/// 默认轮询间隔
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct Controller<C: TrafficClient, W: Write> {
    session: Session<C>,
    cfg: TrafficConfig,
    out: W,
    poll_interval: Duration,
}

impl<C: TrafficClient, W: Write> Controller<C, W> {
    pub fn new(client: C, cfg: TrafficConfig, out: W) -> Self {
        Self {
            session: Session::new(client),
            cfg,
            out,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn set_poll_interval(&mut self, interval: Duration) {
        self.poll_interval = interval;
    }

    pub fn session(&self) -> &Session<C> {
        &self.session
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// 运行完整流程并返回进程退出码；返回前会话一定已关闭。
    pub fn execute(&mut self, interrupt: &Interrupt) -> i32 {
        let code = match self.run(interrupt) {
            Ok(()) => 0,
            Err(ControlError::Interrupted) => {
                self.abort();
                1
            }
            Err(e) => {
                error!(error = %e, "❌ 控制流程失败");
                eprintln!("{e}");
                1
            }
        };
        self.session.close();
        code
    }

    #[tracing::instrument(skip_all, fields(profile = %self.cfg.profile))]
    pub fn run(&mut self, interrupt: &Interrupt) -> Result<(), ControlError> {
        self.session.connect()?;
        let sys = self.session.server_system_info()?;
        let version = self.session.server_version()?;
        self.say(&report::connected_banner(&sys, &version))?;
        checkpoint(interrupt)?;

        self.session.reset(&PORTS)?;
        self.say("Entering service mode...")?;
        self.session.set_service_mode(&PORTS, true)?;
        for p in PORTS {
            let idx = usize::from(p);
            let (ip, gw) = (self.cfg.ip_addr[idx], self.cfg.default_gw[idx]);
            self.say(&format!("Setting port {p} into L3 mode..."))?;
            self.say(&format!("{:18} {}", "IP Address:", ip))?;
            self.say(&format!("{:18} {}", "Default Gateway:", gw))?;
            self.session.set_l3_mode(p, ip, gw)?;
        }
        checkpoint(interrupt)?;

        self.say("Resolve ...")?;
        self.session.resolve(&PORTS)?;
        self.say("Leaving service mode...")?;
        self.session.set_service_mode(&PORTS, false)?;
        checkpoint(interrupt)?;

        self.say("Port info:")?;
        let infos = self.session.port_info(&PORTS)?;
        for line in report::port_info_table(&PORTS, &infos) {
            self.say(&line)?;
        }
        self.say("")?;

        self.say(&format!("{:15} {}", "Packet length:", self.cfg.pkt_len))?;
        self.say(&format!("{:15} {}", "Multiplier:", self.cfg.multiplier))?;
        self.say(&format!("{:15} {}", "Profile:", self.cfg.profile))?;
        self.say("")?;

        for p in PORTS {
            self.say(&format!("Setting up stream on port {p}..."))?;
            let plan = StreamPlan::for_direction(&self.cfg, p);
            for line in plan.describe() {
                self.say(&line)?;
            }
            let stream = plan.build(self.cfg.pkt_len)?;
            self.session.add_streams(p, vec![stream])?;
        }
        checkpoint(interrupt)?;

        self.say("Clearing stats...")?;
        self.session.clear_stats()?;
        self.say("Start traffic...")?;
        self.session.start(&PORTS, &self.cfg.multiplier)?;
        info!(mult = %self.cfg.multiplier, "▶️  流量已启动");

        self.poll(interrupt)
    }

    fn poll(&mut self, interrupt: &Interrupt) -> Result<(), ControlError> {
        let deadline = self.cfg.duration().map(|d| Instant::now() + d);
        let mut rows = 0usize;
        loop {
            checkpoint(interrupt)?;
            if rows % HEADER_EVERY == 0 {
                self.say("")?;
                for line in report::rate_header(&PORTS) {
                    self.say(&line)?;
                }
            }
            let snapshot = self.session.stats(&PORTS)?;
            self.say(&report::rate_row(&snapshot, &PORTS))?;
            rows += 1;

            if deadline.is_some_and(|d| Instant::now() >= d) {
                self.session.stop(&PORTS)?;
                info!(rows, "⏹️  已到设定时长，停止发送");
                return Ok(());
            }
            if interrupt.wait(self.poll_interval) {
                return Err(ControlError::Interrupted);
            }
        }
    }

    /// 中断后的清理：停止发送并打印累计计数；这里的失败只记录不上抛。
    fn abort(&mut self) {
        if let Err(e) = self.say("Interrupted...") {
            warn!(error = %e, "输出失败");
        }
        if self.session.is_open() {
            if let Err(e) = self.session.stop(&PORTS) {
                warn!(error = %e, "停止发送失败");
            }
        }
        match self.session.stats(&PORTS) {
            Ok(snapshot) => {
                for line in report::counters_table(&snapshot, &PORTS) {
                    if let Err(e) = self.say(&line) {
                        warn!(error = %e, "输出失败");
                        break;
                    }
                }
            }
            Err(e) => warn!(error = %e, "读取统计失败"),
        }
    }

    fn say(&mut self, line: &str) -> Result<(), ControlError> {
        writeln!(self.out, "{line}")?;
        self.out.flush()?;
        Ok(())
    }
}

fn checkpoint(interrupt: &Interrupt) -> Result<(), ControlError> {
    if interrupt.is_raised() {
        warn!("⚠️  收到中断请求");
        return Err(ControlError::Interrupted);
    }
    Ok(())
}
